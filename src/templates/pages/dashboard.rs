use crate::db::scrapes::ScrapeRun;
use crate::domain::filters::{FlatFilter, MarketFilter, Range, SortColumn, TOP_CHOICES};
use crate::domain::stats::{format_thousands, DistrictStat, FlatSummary, MarketKpis};
use crate::domain::Feature;
use crate::templates::components::{card, kpi};
use crate::templates::desktop_layout;
use chrono::DateTime;
use maud::{html, Markup};

/// Rows rendered in the offers table; the export has all of them.
pub const SHOWN_FLATS: usize = 100;

#[derive(Debug, Clone, Default)]
pub struct FilterOptions {
    pub districts: Vec<String>,
    pub ownerships: Vec<String>,
    pub construction_statuses: Vec<String>,
}

pub struct DashboardVm {
    pub filter: FlatFilter,
    /// Raw query string, forwarded to the export link.
    pub query: String,
    pub options: FilterOptions,
    pub stored: i64,
    pub kpis: MarketKpis,
    pub ranking: Vec<DistrictStat>,
    pub flats: Vec<FlatSummary>,
    /// Top deals at both ends of `filter.sort`.
    pub lowest: Vec<FlatSummary>,
    pub highest: Vec<FlatSummary>,
    pub recent_runs: Vec<ScrapeRun>,
}

pub fn dashboard_page(vm: &DashboardVm) -> Markup {
    let export_href = if vm.query.is_empty() {
        "/export".to_string()
    } else {
        format!("/export?{}", vm.query)
    };

    desktop_layout(
        "Warsaw flats",
        html! {
            main {
                h1 { "Warsaw flat market" }
                p { (vm.stored) " offers stored, " (vm.kpis.offers) " match the filters." }

                (filter_form(vm))

                div class="kpis" {
                    (kpi("Offers", &vm.kpis.offers.to_string()))
                    (kpi("Median price", &money(vm.kpis.median_price, "zł")))
                    (kpi("Median price per m²", &money(vm.kpis.median_price_per_sq_m, "zł/m²")))
                    (kpi("Median area", &vm.kpis.median_area.map(|a| format!("{a:.1} m²")).unwrap_or_else(|| "–".into())))
                }

                (card("Districts by median price per m²", ranking_table(&vm.ranking)))

                div class="top-deals" {
                    (card(&format!("Lowest {}", vm.filter.sort.label()), top_table(&vm.lowest)))
                    (card(&format!("Highest {}", vm.filter.sort.label()), top_table(&vm.highest)))
                }

                (card("Offers", html! {
                    p {
                        a href=(export_href) { "Download as XLSX" }
                        @if vm.flats.len() > SHOWN_FLATS {
                            " (showing " (SHOWN_FLATS) " of " (vm.flats.len()) ")"
                        }
                    }
                    (flats_table(&vm.flats[..vm.flats.len().min(SHOWN_FLATS)]))
                }))

                (card("Recent scrapes", runs_table(&vm.recent_runs)))
            }
        },
    )
}

fn filter_form(vm: &DashboardVm) -> Markup {
    let f = &vm.filter;
    html! {
        form class="filters card" action="/" method="get" {
            label {
                "District"
                select name="district" multiple size="6" {
                    @for d in &vm.options.districts {
                        option value=(d) selected[f.districts.contains(d)] { (d) }
                    }
                }
            }
            label {
                "Market"
                select name="market" {
                    @for m in [MarketFilter::All, MarketFilter::Primary, MarketFilter::Secondary] {
                        option value=(m.as_str()) selected[f.market == m] { (m.as_str()) }
                    }
                }
            }
            label {
                "Ownership"
                select name="ownership" multiple size="4" {
                    @for o in &vm.options.ownerships {
                        option value=(o) selected[f.ownership.contains(o)] { (o) }
                    }
                }
            }
            label {
                "Construction status"
                select name="construction_status" multiple size="4" {
                    @for s in &vm.options.construction_statuses {
                        option value=(s) selected[f.construction_status.contains(s)] { (s) }
                    }
                }
            }
            (range_inputs("Price", "price", f.price))
            (range_inputs("Price per m²", "price_per_sq_m", f.price_per_sq_m))
            (range_inputs("Area", "area", f.area))
            (range_inputs("Floor", "floor", f.floor))
            (range_inputs("Built year", "built_year", f.built_year))
            label {
                "Top deals"
                select name="top" {
                    @for n in TOP_CHOICES {
                        option value=(n) selected[f.top == n] { (n) }
                    }
                }
                select name="sort" {
                    @for s in SortColumn::ALL {
                        option value=(s.column()) selected[f.sort == s] { (s.label()) }
                    }
                }
            }
            fieldset {
                legend { "Must have" }
                @for feature in Feature::ALL {
                    label {
                        input type="checkbox" name="feature" value=(feature.column())
                            checked[f.features.contains(&feature)];
                        (feature.label())
                    }
                }
            }
            div { button type="submit" { "Apply" } " " a href="/" { "Reset" } }
        }
    }
}

fn range_inputs(label: &str, key: &str, range: Range) -> Markup {
    html! {
        label {
            (label)
            input type="number" step="any" name=(format!("min_{key}")) placeholder="min" value=[range.min];
            input type="number" step="any" name=(format!("max_{key}")) placeholder="max" value=[range.max];
        }
    }
}

fn ranking_table(ranking: &[DistrictStat]) -> Markup {
    html! {
        @if ranking.is_empty() {
            p { "No priced offers." }
        } @else {
            table {
                thead { tr { th { "#" } th { "District" } th { "Offers" } th { "Median zł/m²" } } }
                tbody {
                    @for (i, d) in ranking.iter().enumerate() {
                        tr {
                            td { (i + 1) }
                            td { (d.district) }
                            td class="num" { (d.offers) }
                            td class="num" { (format_thousands(d.median_price_per_sq_m)) }
                        }
                    }
                }
            }
        }
    }
}

fn top_table(flats: &[FlatSummary]) -> Markup {
    html! {
        @if flats.is_empty() {
            p { "No results for selected filters." }
        } @else {
            table {
                thead {
                    tr {
                        th { "District" } th { "Price" } th { "zł/m²" } th { "Area" }
                        th { "Rooms" } th { "Floor" } th { "" }
                    }
                }
                tbody {
                    @for flat in flats {
                        tr {
                            td { (flat.district) }
                            td class="num" { (money(flat.price, "")) }
                            td class="num" { (money(flat.price_per_sq_m, "")) }
                            td class="num" { (opt(flat.area.map(|a| format!("{a:.1}")))) }
                            td class="num" { (opt(flat.no_rooms)) }
                            td class="num" { (opt(flat.no_floor)) }
                            td { a href=(flat.url) target="_blank" rel="noopener" { "offer" } }
                        }
                    }
                }
            }
        }
    }
}

fn flats_table(flats: &[FlatSummary]) -> Markup {
    html! {
        table {
            thead {
                tr {
                    th { "District" } th { "Price" } th { "Area" } th { "zł/m²" }
                    th { "Rooms" } th { "Floor" } th { "Built" } th { "Market" } th { "Scraped" } th { "" }
                }
            }
            tbody {
                @for flat in flats {
                    tr {
                        td { (flat.district) }
                        td class="num" { (money(flat.price, "")) }
                        td class="num" { (opt(flat.area.map(|a| format!("{a:.1}")))) }
                        td class="num" { (money(flat.price_per_sq_m, "")) }
                        td class="num" { (opt(flat.no_rooms)) }
                        td class="num" { (opt(flat.no_floor)) }
                        td class="num" { (opt(flat.built_year)) }
                        td {
                            @match flat.is_primary {
                                Some(true) => "primary",
                                Some(false) => "secondary",
                                None => "–",
                            }
                        }
                        td { (opt(flat.date_scraped.as_deref())) }
                        td { a href=(flat.url) target="_blank" rel="noopener" { "offer" } }
                    }
                }
            }
        }
    }
}

fn runs_table(runs: &[ScrapeRun]) -> Markup {
    html! {
        @if runs.is_empty() {
            p { "No scrapes recorded yet." }
        } @else {
            table {
                thead {
                    tr {
                        th { "Started" } th { "Batch file" } th { "Partitions" } th { "Pages" }
                        th { "Records" } th { "Status" }
                    }
                }
                tbody {
                    @for run in runs {
                        tr {
                            td { (timestamp(run.started_at)) }
                            td { (run.batch_file) }
                            td class="num" {
                                (opt(run.partitions_done))
                                @if let Some(failed) = run.partitions_failed.filter(|n| *n > 0) {
                                    span class="error" { " (" (failed) " failed)" }
                                }
                            }
                            td class="num" { (opt(run.pages_fetched)) }
                            td class="num" { (opt(run.records_written)) }
                            td {
                                @if run.finished_at.is_none() {
                                    "running"
                                } @else if run.success {
                                    "ok"
                                } @else {
                                    span class="error" { (run.error_message.as_deref().unwrap_or("failed")) }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn money(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) if unit.is_empty() => format_thousands(v),
        Some(v) => format!("{} {unit}", format_thousands(v)),
        None => "–".into(),
    }
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "–".into())
}

fn timestamp(unix: i64) -> String {
    DateTime::from_timestamp(unix, 0)
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| unix.to_string())
}
