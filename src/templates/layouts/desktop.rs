use maud::{html, Markup, PreEscaped, DOCTYPE};

const STYLE: &str = "
body { font-family: system-ui, sans-serif; margin: 0; color: #222; }
header { display: flex; align-items: center; justify-content: space-between; padding: 0.75rem 1.5rem; box-shadow: 0 1px 3px #0002; }
main { max-width: 1200px; margin: 1.5rem auto; padding: 0 1rem; }
.card { border: 1px solid #ddd; border-radius: 8px; padding: 1rem; margin-bottom: 1rem; }
.kpis { display: grid; grid-template-columns: repeat(4, 1fr); gap: 1rem; }
.kpi strong { display: block; font-size: 1.4rem; }
table { border-collapse: collapse; width: 100%; }
th, td { text-align: left; padding: 0.3rem 0.5rem; border-bottom: 1px solid #eee; }
td.num { text-align: right; }
form.filters { display: grid; grid-template-columns: repeat(4, 1fr); gap: 0.75rem; }
.error { color: #dc2626; }
";

pub fn desktop_layout(title: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                style { (PreEscaped(STYLE)) }
            }
            body {
                header {
                    h3 { "Warsaw flats" }
                    nav {
                        a href="/" { "Market" }
                        " · "
                        a href="/export" { "Export all" }
                    }
                }
                (content)
            }
        }
    }
}
