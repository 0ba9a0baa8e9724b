//! Fixed demo analysis returned when the language model is unavailable.

use chrono::Utc;

use rivalscope_shared::{Analysis, CompetitorProfile, DesignStyle, PricingTier};

/// Identifier of the demo analysis.
pub const DEMO_ANALYSIS_ID: &str = "demo-analysis";

/// Base title of the demo analysis; fallback titles append a reason tag.
pub const DEMO_TITLE: &str = "Demo Competitor Analysis";

/// Why the demo dataset was returned instead of a live analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoReason {
    /// No API key was configured; nothing was fetched.
    MissingApiKey,
    /// An enrichment or synthesis call failed.
    AiUnavailable,
}

impl DemoReason {
    /// Tag appended to the demo title.
    pub fn marker(&self) -> &'static str {
        match self {
            Self::MissingApiKey => "API Key Required",
            Self::AiUnavailable => "AI Service Unavailable",
        }
    }
}

/// The demo analysis, titled for `reason`.
pub fn demo_analysis(reason: DemoReason) -> Analysis {
    let mut analysis = demo_dataset();
    analysis.title = format!("{DEMO_TITLE} ({})", reason.marker());
    analysis
}

/// The untagged demo dataset.
pub fn demo_dataset() -> Analysis {
    Analysis {
        id: DEMO_ANALYSIS_ID.into(),
        user_id: Some("demo-user".into()),
        title: DEMO_TITLE.into(),
        competitors: vec![techflow(), workspace_pro(), agileboard()],
        summary: "The project management software market shows clear segmentation with three \
                  distinct approaches: TechFlow Solutions targets enterprise clients with \
                  comprehensive features and premium pricing, WorkSpace Pro focuses on \
                  small-to-medium businesses with user-friendly design and competitive pricing, \
                  while AgileBoard specializes in developer teams with technical features and \
                  agile methodologies. Each competitor has carved out their niche, but there are \
                  opportunities for differentiation through specialized features, better user \
                  experience, or underserved market segments."
            .into(),
        opportunities: strings(&[
            "Gap in mobile-first project management solutions for field teams",
            "Underserved small business segment with budget constraints under $20/month",
            "Integration opportunities with emerging AI and automation tools",
            "Potential for industry-specific customizations (healthcare, education, construction)",
            "White-label solutions for agencies and consultants",
            "Focus on async/remote work collaboration features",
            "Simplified onboarding for non-technical users",
        ]),
        threats: strings(&[
            "Established competitors with strong brand recognition and customer loyalty",
            "Price competition from low-cost alternatives and open-source solutions",
            "Feature creep making products complex for new users",
            "Large tech companies (Microsoft, Google, Atlassian) with integrated ecosystems",
            "Economic downturn affecting business software spending",
            "Increasing customer acquisition costs in saturated market",
            "Security and compliance requirements raising barriers to entry",
        ]),
        recommendations: strings(&[
            "Focus on a specific niche or industry vertical to differentiate from general solutions",
            "Emphasize ease of use and quick setup as key differentiators against complex competitors",
            "Consider freemium model with generous free tier to compete with established players",
            "Invest heavily in mobile experience as competitors seem primarily desktop-focused",
            "Build strong integration ecosystem with popular business tools (Slack, Google Workspace, etc.)",
            "Offer exceptional customer support and onboarding as a competitive advantage",
            "Develop AI-powered features for task automation and intelligent insights",
            "Create industry-specific templates and workflows for faster adoption",
        ]),
        created_at: Utc::now(),
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn tier(name: &str, price: &str, features: &[&str]) -> PricingTier {
    PricingTier {
        name: name.into(),
        price: price.into(),
        features: strings(features),
        is_popular: None,
    }
}

fn style(colors: &[&str], layout: &str, imagery: &str) -> DesignStyle {
    DesignStyle {
        primary_colors: strings(colors),
        layout: layout.into(),
        imagery: imagery.into(),
    }
}

fn techflow() -> CompetitorProfile {
    CompetitorProfile {
        id: "demo-1".into(),
        url: "https://example-competitor-1.com".into(),
        name: "TechFlow Solutions".into(),
        description: "A comprehensive project management platform designed for modern teams, \
                      offering advanced collaboration tools, automated workflows, and real-time \
                      analytics to streamline business operations and boost productivity."
            .into(),
        pricing: vec![
            tier(
                "Starter",
                "$29/month",
                &["Up to 10 users", "Basic reporting", "Email support", "5GB storage"],
            ),
            tier(
                "Professional",
                "$79/month",
                &[
                    "Up to 50 users",
                    "Advanced analytics",
                    "Priority support",
                    "Custom integrations",
                    "50GB storage",
                ],
            ),
            tier(
                "Enterprise",
                "$199/month",
                &[
                    "Unlimited users",
                    "Custom workflows",
                    "24/7 support",
                    "White-label options",
                    "Unlimited storage",
                ],
            ),
        ],
        features: strings(&[
            "Project Management",
            "Team Collaboration",
            "Time Tracking",
            "Custom Workflows",
            "API Integration",
            "Advanced Reporting",
            "Mobile Apps",
            "Third-party Integrations",
        ]),
        marketing_tone: "Professional and Enterprise-focused".into(),
        design_style: style(&["#2563eb", "#1e40af"], "Clean and Modern", "Professional Business"),
        calls_to_action: strings(&[
            "Start Free Trial",
            "Schedule Demo",
            "Contact Sales",
            "Watch Demo",
        ]),
        created_at: Utc::now(),
        analysis_id: DEMO_ANALYSIS_ID.into(),
    }
}

fn workspace_pro() -> CompetitorProfile {
    CompetitorProfile {
        id: "demo-2".into(),
        url: "https://example-competitor-2.com".into(),
        name: "WorkSpace Pro".into(),
        description: "An all-in-one workspace solution that combines document management, team \
                      communication, and project tracking in a single, intuitive platform \
                      designed for growing businesses and remote teams."
            .into(),
        pricing: vec![
            tier(
                "Basic",
                "$19/month",
                &["5 team members", "10GB storage", "Basic templates", "Email support"],
            ),
            tier(
                "Premium",
                "$49/month",
                &[
                    "25 team members",
                    "100GB storage",
                    "Advanced templates",
                    "Integrations",
                    "Priority support",
                ],
            ),
            tier(
                "Business",
                "$99/month",
                &[
                    "Unlimited members",
                    "1TB storage",
                    "Custom branding",
                    "Advanced security",
                    "API access",
                ],
            ),
        ],
        features: strings(&[
            "Document Management",
            "Team Chat",
            "Task Management",
            "File Sharing",
            "Mobile Apps",
            "Video Conferencing",
            "Calendar Integration",
            "Custom Templates",
        ]),
        marketing_tone: "Friendly and Approachable".into(),
        design_style: style(&["#059669", "#047857"], "Minimalist and Clean", "Diverse Teams"),
        calls_to_action: strings(&["Try for Free", "Get Started", "Learn More", "Book a Call"]),
        created_at: Utc::now(),
        analysis_id: DEMO_ANALYSIS_ID.into(),
    }
}

fn agileboard() -> CompetitorProfile {
    CompetitorProfile {
        id: "demo-3".into(),
        url: "https://example-competitor-3.com".into(),
        name: "AgileBoard".into(),
        description: "A specialized agile project management tool built for software \
                      development teams, featuring sprint planning, backlog management, and \
                      advanced reporting capabilities with seamless CI/CD integration."
            .into(),
        pricing: vec![
            tier(
                "Developer",
                "$15/month",
                &["Up to 3 projects", "Basic agile tools", "Community support", "5GB storage"],
            ),
            tier(
                "Team",
                "$45/month",
                &[
                    "Unlimited projects",
                    "Advanced reporting",
                    "Email support",
                    "CI/CD integration",
                    "25GB storage",
                ],
            ),
            tier(
                "Enterprise",
                "$120/month",
                &[
                    "Advanced security",
                    "Custom fields",
                    "24/7 support",
                    "SSO integration",
                    "Unlimited storage",
                ],
            ),
        ],
        features: strings(&[
            "Sprint Planning",
            "Backlog Management",
            "Burndown Charts",
            "CI/CD Integration",
            "Code Repository Links",
            "Time Tracking",
            "Custom Workflows",
            "Team Velocity Tracking",
        ]),
        marketing_tone: "Technical and Developer-focused".into(),
        design_style: style(&["#7c3aed", "#5b21b6"], "Dashboard-heavy", "Code and Development"),
        calls_to_action: strings(&[
            "Start Free Trial",
            "View Demo",
            "Developer Docs",
            "Contact Team",
        ]),
        created_at: Utc::now(),
        analysis_id: DEMO_ANALYSIS_ID.into(),
    }
}
