//! Feature templates
//!
//! Static tables mapping each feature type to its keywords and the files a
//! plan for that feature produces. In the `custom` template `{Name}` and
//! `{name}` are replaced with the PascalCase and camelCase feature name.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::step::{Complexity, StepType};

/// Kind of feature a request asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureType {
    Authentication,
    Dashboard,
    Crud,
    Ecommerce,
    Settings,
    Landing,
    Navigation,
    Chat,
    Custom,
}

impl FeatureType {
    pub fn all() -> &'static [FeatureType] {
        &[
            Self::Authentication,
            Self::Dashboard,
            Self::Crud,
            Self::Ecommerce,
            Self::Settings,
            Self::Landing,
            Self::Navigation,
            Self::Chat,
            Self::Custom,
        ]
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Authentication => "authentication",
            Self::Dashboard => "dashboard",
            Self::Crud => "crud",
            Self::Ecommerce => "ecommerce",
            Self::Settings => "settings",
            Self::Landing => "landing",
            Self::Navigation => "navigation",
            Self::Chat => "chat",
            Self::Custom => "custom",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for FeatureType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|ft| ft.to_string() == wanted)
            .ok_or_else(|| format!("Unknown feature type '{}'", s.trim()))
    }
}

/// One file in a feature template
#[derive(Debug, Clone, Copy)]
pub struct StepTemplate {
    /// Template-local key referenced by `depends_on`
    pub key: &'static str,
    pub step_type: StepType,
    pub name: &'static str,
    pub description: &'static str,
    pub depends_on: &'static [&'static str],
    /// Minimum plan complexity that includes this step
    pub tier: Complexity,
}

#[derive(Debug, Clone, Copy)]
pub struct FeatureTemplate {
    pub feature_type: FeatureType,
    pub display_name: &'static str,
    /// Single words match request tokens, phrases match the normalised text
    pub keywords: &'static [&'static str],
    /// Dependencies always point at earlier entries
    pub steps: &'static [StepTemplate],
}

const fn step(
    key: &'static str,
    step_type: StepType,
    name: &'static str,
    description: &'static str,
    depends_on: &'static [&'static str],
    tier: Complexity,
) -> StepTemplate {
    StepTemplate {
        key,
        step_type,
        name,
        description,
        depends_on,
        tier,
    }
}

use Complexity::{Complex, Moderate, Simple};
use StepType::{Component, Hook, Page, Util};

/// Every non-custom template, in tie-breaking order
pub static TEMPLATES: &[FeatureTemplate] = &[
    FeatureTemplate {
        feature_type: FeatureType::Authentication,
        display_name: "Authentication",
        keywords: &[
            "login", "logout", "signin", "signup", "sign in", "sign up", "register",
            "registration", "auth", "authentication", "password", "forgot password", "oauth",
            "session",
        ],
        steps: &[
            step("validation", Util, "authValidation", "Validation helpers for email, password and confirmation fields", &[], Moderate),
            step("hook", Hook, "useAuth", "Authentication state hook exposing the current user and login, logout and signup actions", &[], Moderate),
            step("login", Component, "LoginForm", "Login form with email and password fields, inline validation errors and a submit state", &["hook", "validation"], Simple),
            step("signup", Component, "SignupForm", "Registration form with name, email, password and confirmation fields", &["hook", "validation"], Moderate),
            step("reset", Component, "ForgotPasswordForm", "Password reset request form with success confirmation", &["hook"], Complex),
            step("page", Page, "Login", "Authentication page switching between the login and signup forms", &["login", "signup"], Moderate),
            step("guard", Component, "ProtectedRoute", "Route guard that redirects unauthenticated users to the login page", &["hook"], Complex),
        ],
    },
    FeatureTemplate {
        feature_type: FeatureType::Dashboard,
        display_name: "Dashboard",
        keywords: &[
            "dashboard", "analytics", "metrics", "stats", "statistics", "chart", "charts",
            "kpi", "overview", "widgets", "report", "reports",
        ],
        steps: &[
            step("data", Hook, "useDashboardData", "Hook that loads dashboard metrics and exposes loading and error state", &[], Moderate),
            step("format", Util, "formatMetrics", "Number, currency and percentage formatting helpers", &[], Complex),
            step("stat", Component, "StatCard", "Metric card showing a value, label and trend indicator", &[], Simple),
            step("chart", Component, "ChartPanel", "Card wrapping a time-series chart with a range selector", &["data"], Moderate),
            step("activity", Component, "RecentActivity", "List of recent activity entries with timestamps", &["data"], Complex),
            step("layout", Component, "DashboardLayout", "Responsive grid arranging stat cards and chart panels", &["stat", "chart"], Simple),
            step("page", Page, "Dashboard", "Dashboard page wiring the data hook into the layout", &["layout", "data"], Moderate),
        ],
    },
    FeatureTemplate {
        feature_type: FeatureType::Crud,
        display_name: "DataManagement",
        keywords: &[
            "crud", "table", "data table", "records", "manage", "management", "inventory",
            "admin", "entries", "list view", "pagination",
        ],
        steps: &[
            step("api", Util, "dataApi", "Fetch helpers for list, create, update and delete requests", &[], Moderate),
            step("hook", Hook, "useDataTable", "Hook managing records with pagination, sorting and filtering", &["api"], Moderate),
            step("table", Component, "DataTable", "Sortable, paginated table of records with row actions", &[], Simple),
            step("form", Component, "RecordForm", "Form for creating and editing a single record", &[], Simple),
            step("dialog", Component, "DeleteConfirmDialog", "Confirmation dialog shown before deleting a record", &[], Moderate),
            step("filters", Component, "TableFilters", "Search input and filter controls for the table", &["hook"], Complex),
            step("page", Page, "Records", "Management page combining the table, the record form and dialogs", &["table", "form", "hook"], Moderate),
        ],
    },
    FeatureTemplate {
        feature_type: FeatureType::Ecommerce,
        display_name: "Shop",
        keywords: &[
            "ecommerce", "e-commerce", "shop", "store", "cart", "shopping cart", "checkout",
            "product", "products", "catalog", "orders", "payment",
        ],
        steps: &[
            step("cart", Hook, "useCart", "Cart state hook with add, remove and quantity updates", &[], Moderate),
            step("price", Util, "formatPrice", "Currency formatting and cart total helpers", &[], Moderate),
            step("card", Component, "ProductCard", "Product card with image, title, price and add-to-cart button", &[], Simple),
            step("grid", Component, "ProductGrid", "Responsive grid of product cards", &["card"], Simple),
            step("drawer", Component, "CartDrawer", "Slide-over cart with line items, quantities and totals", &["cart", "price"], Moderate),
            step("checkout", Component, "CheckoutForm", "Checkout form with shipping and payment sections", &["cart"], Complex),
            step("page", Page, "Shop", "Shop page with the product grid and cart drawer", &["grid", "drawer"], Moderate),
        ],
    },
    FeatureTemplate {
        feature_type: FeatureType::Settings,
        display_name: "Settings",
        keywords: &[
            "settings", "preferences", "profile", "account", "configuration", "theme",
            "dark mode", "notification settings",
        ],
        steps: &[
            step("hook", Hook, "useSettings", "Hook that loads and saves user settings", &[], Moderate),
            step("profile", Component, "ProfileSettings", "Profile form with avatar, display name and email", &[], Simple),
            step("notifications", Component, "NotificationSettings", "Notification preference switches grouped by channel", &[], Moderate),
            step("appearance", Component, "AppearanceSettings", "Theme and display preferences", &[], Complex),
            step("security", Component, "SecuritySettings", "Password change and two-factor authentication settings", &[], Complex),
            step("layout", Component, "SettingsLayout", "Tabbed layout switching between settings sections", &["profile", "notifications"], Moderate),
            step("page", Page, "Settings", "Settings page connecting the layout to the settings hook", &["layout", "hook"], Moderate),
        ],
    },
    FeatureTemplate {
        feature_type: FeatureType::Landing,
        display_name: "Landing",
        keywords: &[
            "landing", "landing page", "hero", "marketing", "pricing", "testimonials",
            "homepage", "cta", "call to action", "newsletter",
        ],
        steps: &[
            step("hero", Component, "HeroSection", "Hero section with headline, supporting copy and primary actions", &[], Simple),
            step("features", Component, "FeaturesSection", "Grid of feature highlights with icons", &[], Moderate),
            step("pricing", Component, "PricingSection", "Pricing tiers with a monthly/yearly toggle", &[], Moderate),
            step("testimonials", Component, "TestimonialsSection", "Customer testimonials carousel", &[], Complex),
            step("cta", Component, "CallToAction", "Closing call-to-action banner with newsletter signup", &[], Complex),
            step("footer", Component, "SiteFooter", "Footer with link columns and social links", &[], Moderate),
            step("page", Page, "Landing", "Landing page composing all sections", &["hero", "features", "pricing", "footer"], Moderate),
        ],
    },
    FeatureTemplate {
        feature_type: FeatureType::Navigation,
        display_name: "Navigation",
        keywords: &[
            "navigation", "navbar", "nav", "sidebar", "menu", "breadcrumb", "breadcrumbs",
            "header", "app shell",
        ],
        steps: &[
            step("route", Hook, "useActiveRoute", "Hook reporting the active route for highlighting links", &[], Moderate),
            step("navbar", Component, "Navbar", "Responsive top navigation bar with logo and links", &[], Simple),
            step("mobile", Component, "MobileNav", "Mobile navigation drawer opened from the navbar", &["navbar"], Moderate),
            step("sidebar", Component, "Sidebar", "Collapsible sidebar with grouped links", &["route"], Moderate),
            step("breadcrumbs", Component, "Breadcrumbs", "Breadcrumb trail for nested routes", &["route"], Complex),
            step("shell", Component, "AppShell", "Layout combining the navbar, sidebar and content area", &["navbar", "sidebar"], Complex),
        ],
    },
    FeatureTemplate {
        feature_type: FeatureType::Chat,
        display_name: "Chat",
        keywords: &[
            "chat", "messaging", "messages", "message", "conversation", "conversations",
            "inbox", "direct message",
        ],
        steps: &[
            step("hook", Hook, "useChat", "Chat state hook for messages, sending and loading state", &[], Moderate),
            step("time", Util, "formatMessageTime", "Relative timestamp formatting for messages", &[], Complex),
            step("bubble", Component, "MessageBubble", "Message bubble styled by sender with timestamp", &[], Simple),
            step("list", Component, "MessageList", "Scrollable message list that sticks to the newest message", &["bubble"], Simple),
            step("input", Component, "MessageInput", "Message composer with send button and keyboard submit", &[], Simple),
            step("window", Component, "ChatWindow", "Chat window combining the message list and composer", &["list", "input", "hook"], Moderate),
            step("conversations", Component, "ConversationList", "Sidebar list of conversations with unread counts", &[], Complex),
            step("page", Page, "Chat", "Chat page hosting the chat window", &["window"], Moderate),
        ],
    },
];

/// Fallback for requests that match no template
pub static CUSTOM_TEMPLATE: FeatureTemplate = FeatureTemplate {
    feature_type: FeatureType::Custom,
    display_name: "Feature",
    keywords: &[],
    steps: &[
        step("util", Util, "{name}Utils", "Helper functions used by {Name}", &[], Complex),
        step("hook", Hook, "use{Name}", "State and data hook for {Name}", &[], Moderate),
        step("item", Component, "{Name}Item", "Child component rendering a single {Name} entry", &[], Moderate),
        step("main", Component, "{Name}", "Main {Name} component", &["hook", "item"], Simple),
        step("page", Page, "{Name}", "Page presenting the {Name} feature", &["main"], Complex),
    ],
};

/// Template for a feature type
pub fn template_for(feature_type: FeatureType) -> &'static FeatureTemplate {
    TEMPLATES
        .iter()
        .find(|t| t.feature_type == feature_type)
        .unwrap_or(&CUSTOM_TEMPLATE)
}
