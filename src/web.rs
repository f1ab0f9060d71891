use maud::{DOCTYPE, Markup, PreEscaped, html};

use crate::stats::{CampaignStats, action_label};

const STATS_REFRESH_SECONDS: u32 = 30;

pub fn render_home() -> String {
    page(
        "Email Campaign Tracker",
        None,
        html! {
            section class="ct-card ct-center" {
                h1 { "Email Campaign Tracker" }
                p class="ct-muted" { "The tracking server is up and recording events." }
                a class="ct-btn primary" href="/stats" { "View campaign stats" }
            }
        },
    )
}

pub fn render_stats(stats: &CampaignStats) -> String {
    page(
        "Campaign Stats",
        Some(STATS_REFRESH_SECONDS),
        html! {
            section class="ct-card" {
                h1 { "Campaign Stats" }
                div class="ct-grid" {
                    (stat_card(stats.total_sent, "Emails sent", None))
                    (stat_card(stats.total_opens, "Opened", Some(stats.open_rate)))
                    (stat_card(stats.total_clicks, "Clicked", Some(stats.click_rate)))
                    (stat_card(stats.total_unsubscribes, "Unsubscribed", None))
                }
                h2 { "Click breakdown" }
                table class="ct-table" {
                    thead {
                        tr {
                            th { "Button" }
                            th { "Clicks" }
                        }
                    }
                    tbody {
                        @if stats.click_breakdown.is_empty() {
                            tr {
                                td colspan="2" class="ct-empty" { "No clicks recorded yet." }
                            }
                        }
                        @for (action, count) in &stats.click_breakdown {
                            tr {
                                td { (action_label(action)) }
                                td class="ct-count" { (count) }
                            }
                        }
                    }
                }
                a class="ct-btn" href="/stats" { "Refresh" }
                p class="ct-muted ct-center" {
                    "This page reloads automatically every " (STATS_REFRESH_SECONDS) " seconds."
                }
            }
        },
    )
}

pub fn render_unsubscribe() -> String {
    page(
        "Unsubscribed",
        None,
        html! {
            section class="ct-card ct-center" {
                h1 { "You have been unsubscribed" }
                p { "You will no longer receive campaign emails from us." }
                p class="ct-muted" { "Thank you for your time." }
            }
        },
    )
}

fn stat_card(value: u64, label: &str, rate: Option<f64>) -> Markup {
    html! {
        div class="ct-stat" {
            div class="ct-stat-number" { (value) }
            div class="ct-stat-label" {
                (label)
                @if let Some(rate) = rate {
                    " (" (format!("{rate:.1}")) "%)"
                }
            }
        }
    }
}

fn page(title: &str, refresh_seconds: Option<u32>, body: Markup) -> String {
    let markup = html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                @if let Some(seconds) = refresh_seconds {
                    meta http-equiv="refresh" content=(seconds);
                }
                title { (title) }
                style { (PreEscaped(styles())) }
            }
            body {
                main class="ct-main" {
                    (body)
                }
            }
        }
    };

    markup.into_string()
}

fn styles() -> &'static str {
    r#"
* { box-sizing: border-box; }
body {
  margin: 0;
  padding: 2rem 1rem;
  min-height: 100vh;
  font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Arial, sans-serif;
  background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
  color: #2d2d3a;
}
.ct-main { max-width: 900px; margin: 0 auto; }
.ct-card {
  background: white;
  border-radius: 18px;
  padding: 2.2rem;
  box-shadow: 0 10px 40px rgba(0, 0, 0, 0.2);
}
.ct-center { text-align: center; }
h1 { color: #667eea; margin-top: 0; }
h2 { color: #667eea; margin-top: 2rem; }
.ct-muted { color: #8a8aa0; line-height: 1.5; }
.ct-grid {
  display: grid;
  grid-template-columns: repeat(auto-fit, minmax(180px, 1fr));
  gap: 1.1rem;
  margin-top: 1.4rem;
}
.ct-stat {
  background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
  color: white;
  border-radius: 12px;
  padding: 1.4rem;
  text-align: center;
}
.ct-stat-number { font-size: 2.6rem; font-weight: 700; }
.ct-stat-label { margin-top: 0.3rem; opacity: 0.9; }
.ct-table { width: 100%; border-collapse: collapse; margin-top: 1rem; }
.ct-table th {
  background: #667eea;
  color: white;
  text-align: left;
  padding: 0.8rem;
}
.ct-table td { padding: 0.7rem 0.8rem; border-bottom: 1px solid #eee; }
.ct-count { font-weight: 700; }
.ct-empty { text-align: center; color: #999; padding: 1.2rem; }
.ct-btn {
  display: inline-block;
  background: #667eea;
  color: white;
  border-radius: 24px;
  padding: 0.7rem 1.6rem;
  margin-top: 1.4rem;
  text-decoration: none;
}
.ct-btn:hover { background: #764ba2; }
"#
}
