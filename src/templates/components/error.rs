use crate::templates::desktop_layout;
use maud::{html, Markup};

pub fn error_page(status: u16, message: &str) -> Markup {
    desktop_layout(
        &format!("Error {status}"),
        html! {
            main {
                h1 { "Error " (status) }
                p class="error" { (message) }
                p { a href="/" { "← Back to the market view" } }
            }
        },
    )
}
