use crate::config::BusinessProfile;
use crate::session::FlowStep;

/// Outbound reply descriptor. The delivery collaborator owns the
/// platform-specific envelope; the engine only decides text and choices.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub choices: Vec<Choice>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), choices: Vec::new() }
    }

    pub fn with_choices(text: impl Into<String>, choices: Vec<Choice>) -> Self {
        Self { text: text.into(), choices }
    }
}

/// A one-tap quick action: label shown to the user, payload token echoed
/// back through the webhook when tapped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Choice {
    pub label: String,
    pub payload: String,
}

impl Choice {
    pub fn new(label: impl Into<String>, payload: impl Into<String>) -> Self {
        Self { label: label.into(), payload: payload.into() }
    }
}

fn back_to_menu() -> Choice {
    Choice::new("Back to Main Menu", "start")
}

pub fn main_menu_choices() -> Vec<Choice> {
    vec![
        Choice::new("Services", "services"),
        Choice::new("FAQs", "faq"),
        Choice::new("Support", "support"),
        Choice::new("Sales", "sales"),
        Choice::new("Contact Us", "contact"),
    ]
}

pub fn main_menu(business: &BusinessProfile) -> Reply {
    Reply::with_choices(
        format!("Hey there! Welcome to {}! How can I help?", business.name),
        main_menu_choices(),
    )
}

pub fn fallback(_business: &BusinessProfile) -> Reply {
    Reply::with_choices(
        "Sorry, I didn't understand that. Try selecting an option or type 'start'.",
        main_menu_choices(),
    )
}

pub fn services() -> Reply {
    Reply::with_choices(
        "We offer automated chatbots for businesses! How can we assist you?",
        vec![Choice::new("Learn More", "learn_more"), back_to_menu()],
    )
}

pub fn learn_more(business: &BusinessProfile) -> Reply {
    Reply::with_choices(
        format!(
            "Learn more about our services: We provide 24/7 customer support, inventory \
             management, and scheduling solutions for businesses like {}. Visit {} for details \
             or contact us at {}!",
            business.name, business.catalog_link, business.support_email
        ),
        vec![back_to_menu()],
    )
}

pub fn faq() -> Reply {
    Reply::with_choices(
        "Here are some FAQs:\n1. What services do you offer?\n2. How much does it cost?\n3. Shipping info?",
        vec![
            Choice::new("Services", "services_info"),
            Choice::new("Cost", "cost"),
            Choice::new("Shipping", "shipping"),
            back_to_menu(),
        ],
    )
}

fn back_to_faq() -> Vec<Choice> {
    vec![Choice::new("Back to FAQs", "faq"), back_to_menu()]
}

pub fn services_info() -> Reply {
    Reply::with_choices(
        "We offer automated chatbots for businesses, providing 24/7 customer support, \
         inventory management, and scheduling solutions.",
        back_to_faq(),
    )
}

pub fn cost(business: &BusinessProfile) -> Reply {
    Reply::with_choices(
        format!(
            "Our chatbot setup starts at {}. Subscription plans available.",
            business.base_price
        ),
        back_to_faq(),
    )
}

pub fn shipping(business: &BusinessProfile) -> Reply {
    Reply::with_choices(
        format!(
            "Shipping takes {} days. Free over {}!",
            business.shipping_days, business.free_shipping_threshold
        ),
        back_to_faq(),
    )
}

pub fn support_menu() -> Reply {
    Reply::with_choices(
        "Let's solve your issue! What's the problem?",
        vec![
            Choice::new("Order Issue", "order_issue"),
            Choice::new("Technical Issue", "tech_issue"),
            back_to_menu(),
        ],
    )
}

pub fn contact(business: &BusinessProfile) -> Reply {
    Reply::with_choices(
        format!("Email: {}\nPhone: {}", business.support_email, business.support_phone),
        vec![back_to_menu()],
    )
}

pub fn sales_menu() -> Reply {
    Reply::with_choices(
        "Interested in our products? What can I help with?",
        vec![
            Choice::new("Products", "products"),
            Choice::new("Offers", "offers"),
            Choice::new("Lead Capture", "lead"),
            back_to_menu(),
        ],
    )
}

fn back_to_sales() -> Vec<Choice> {
    vec![Choice::new("Back to Sales", "sales"), back_to_menu()]
}

pub fn products(business: &BusinessProfile) -> Reply {
    Reply::with_choices(format!("Check our products: {}", business.catalog_link), back_to_sales())
}

pub fn offers(business: &BusinessProfile) -> Reply {
    Reply::with_choices(
        format!("Get 20% off with code {}!", business.promo_code),
        back_to_sales(),
    )
}

pub fn inventory_menu() -> Reply {
    Reply::with_choices(
        "Which product would you like to check? (e.g., chatbot_basic, chatbot_pro)",
        vec![
            Choice::new("Basic Chatbot", "check_basic"),
            Choice::new("Pro Chatbot", "check_pro"),
            Choice::new("Enterprise Chatbot", "check_enterprise"),
            back_to_menu(),
        ],
    )
}

pub fn inventory_status(product: &str, quantity: i64, available: bool, price: &str) -> Reply {
    let availability = if available { "in stock" } else { "out of stock" };
    Reply::with_choices(
        format!("{product}: {quantity} available ({availability}), Price: {price}"),
        vec![back_to_menu()],
    )
}

pub fn inventory_unavailable() -> Reply {
    Reply::with_choices(
        "Sorry, couldn't check inventory. Try again later.",
        vec![back_to_menu()],
    )
}

pub fn schedule_date_prompt() -> Reply {
    Reply::with_choices(
        "When would you like to schedule a consultation? Enter a date (YYYY-MM-DD).",
        vec![back_to_menu()],
    )
}

pub fn schedule_slots(date: &str, slots: &[String]) -> Reply {
    Reply::with_choices(
        format!("Available slots on {date}: {}. Pick a time (HH:MM).", slots.join(", ")),
        vec![back_to_menu()],
    )
}

pub fn schedule_no_slots() -> Reply {
    Reply::with_choices("No slots available on that date. Try another.", vec![back_to_menu()])
}

pub fn schedule_bad_date() -> Reply {
    Reply::with_choices("Invalid date or error. Use YYYY-MM-DD.", vec![back_to_menu()])
}

pub fn schedule_booked(canonical_date: &str) -> Reply {
    Reply::with_choices(
        format!("Appointment booked for {canonical_date}. Anything else?"),
        vec![back_to_menu()],
    )
}

pub fn schedule_booking_failed() -> Reply {
    Reply::with_choices(
        "Couldn't book. Slot unavailable or invalid time. Try again.",
        vec![back_to_menu()],
    )
}

/// Prompt for the next field of an intake flow.
pub fn prompt_for(step: FlowStep) -> Reply {
    match step {
        FlowStep::OrderNumber => Reply::text("Please provide your order number."),
        FlowStep::Name => Reply::text("Please provide your name."),
        FlowStep::Email => Reply::text("Your email address?"),
        FlowStep::Phone => Reply::text("Your phone number?"),
        FlowStep::Urgency => Reply::with_choices(
            "How urgent is this? (Urgent/Not Urgent)",
            vec![Choice::new("Urgent", "urgent"), Choice::new("Not Urgent", "not_urgent")],
        ),
        FlowStep::BusinessName => Reply::text("Your business name?"),
        FlowStep::Website => Reply::text("Your website (if applicable)?"),
        FlowStep::IssueDescription => Reply::text("Please describe your technical issue."),
        FlowStep::AwaitingDate => schedule_date_prompt(),
        // The time prompt always carries the slot list, so it is built in
        // the engine from the collaborator response.
        FlowStep::AwaitingTime => Reply::text("Pick a time (HH:MM)."),
    }
}

pub fn intake_complete() -> Reply {
    Reply::with_choices("Thanks! A team member will follow up soon.", vec![back_to_menu()])
}

pub fn lead_complete() -> Reply {
    Reply::with_choices("Thanks for your info. We'll reach out soon.", vec![back_to_menu()])
}
