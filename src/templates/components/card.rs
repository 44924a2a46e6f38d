use maud::{html, Markup};

pub fn card(title: &str, body: Markup) -> Markup {
    html! {
        section class="card" {
            h2 { (title) }
            div class="card-body" {
                (body)
            }
        }
    }
}

/// A single headline figure.
pub fn kpi(label: &str, value: &str) -> Markup {
    html! {
        div class="kpi card" {
            span { (label) }
            strong { (value) }
        }
    }
}
