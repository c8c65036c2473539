//! French HTML home page
//!
//! Renders the current bridge state, the next scheduled closures, and the
//! calendar subscription links as a single self-contained page. All
//! record-derived text is HTML-escaped.

use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::data::BridgeState;

/// Upper bound on rows in the upcoming-closures table
const MAX_UPCOMING_ROWS: usize = 5;

const WEEKDAYS: [&str; 7] = [
    "lundi", "mardi", "mercredi", "jeudi", "vendredi", "samedi", "dimanche",
];
const MONTHS: [&str; 12] = [
    "janvier",
    "février",
    "mars",
    "avril",
    "mai",
    "juin",
    "juillet",
    "août",
    "septembre",
    "octobre",
    "novembre",
    "décembre",
];

const STYLE: &str = "body{font-family:sans-serif;max-width:42rem;margin:2rem auto;padding:0 1rem;color:#222}\
fieldset{border:1px solid #aaa;border-radius:4px;padding:1rem}\
.closed{color:#b00020;font-weight:bold}\
.open{color:#1a7f37;font-weight:bold}\
table{border-collapse:collapse;width:100%}\
th,td{border:1px solid #ccc;padding:0.4rem 0.6rem;text-align:left}\
footer{margin-top:2rem;font-size:0.85rem;color:#555}";

/// Renders the home page.
///
/// # Arguments
/// * `state` - Bridge state computed at `now`
/// * `base_url` - Public base URL, used for the subscription links
/// * `now` - Local time shown as the page's last-update stamp
pub fn render_home_page(state: &BridgeState, base_url: &str, now: NaiveDateTime) -> String {
    let mut html = String::with_capacity(4096);

    html.push_str("<!DOCTYPE html>\n<html lang=\"fr\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str("<title>Pont Chaban-Delmas - Fermetures</title>\n");
    html.push_str(&format!("<style>{}</style>\n", STYLE));
    html.push_str("</head>\n<body>\n");
    html.push_str("<h1>Pont Chaban-Delmas</h1>\n");

    html.push_str("<fieldset>\n<legend>État actuel</legend>\n");
    match &state.current_event {
        Some(event) => {
            html.push_str("<p class=\"closed\">⚠️ Le pont est actuellement fermé ⚠️</p>\n");
            let reopening = event
                .closure_period()
                .map(|period| french_datetime(period.end))
                .unwrap_or_else(|| "heure inconnue".to_string());
            html.push_str(&format!(
                "<p>Passage du bateau {} - réouverture prévue le {}</p>\n",
                escape_html(&event.vessel),
                reopening
            ));
        }
        None => {
            html.push_str("<p class=\"open\">✅ Le pont est ouvert à la circulation</p>\n");
        }
    }
    html.push_str("</fieldset>\n");

    html.push_str("<h2>Prochaines fermetures</h2>\n");
    if state.upcoming_events.is_empty() {
        html.push_str("<p>Aucune fermeture programmée pour le moment.</p>\n");
    } else {
        html.push_str("<table>\n<thead>\n<tr><th>Date de fermeture</th><th>Date de réouverture</th><th>Bateau</th></tr>\n</thead>\n<tbody>\n");
        for event in state.upcoming_events.iter().take(MAX_UPCOMING_ROWS) {
            let Some(period) = event.closure_period() else {
                continue;
            };
            let total = if event.total_closure.eq_ignore_ascii_case("oui") {
                " <em>(fermeture totale)</em>"
            } else {
                ""
            };
            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}{}</td></tr>\n",
                french_datetime(period.start),
                french_datetime(period.end),
                escape_html(&event.vessel),
                total
            ));
        }
        html.push_str("</tbody>\n</table>\n");
    }

    let webcal = webcal_url(base_url);
    let google = format!(
        "https://calendar.google.com/calendar/render?cid={}",
        urlencoding::encode(&webcal)
    );
    html.push_str("<h2>Abonnez-vous au calendrier</h2>\n<ul>\n");
    html.push_str(&format!(
        "<li><a href=\"{}\">S'abonner depuis votre application calendrier</a></li>\n",
        escape_html(&webcal)
    ));
    html.push_str(&format!(
        "<li><a href=\"{}\">Ajouter à Google Agenda</a></li>\n",
        escape_html(&google)
    ));
    html.push_str("<li><a href=\"/calendar.ics\">Télécharger le fichier .ics</a></li>\n</ul>\n");

    html.push_str(&format!(
        "<footer>\n<p>Données fournies par <a href=\"https://opendata.bordeaux-metropole.fr/\">Bordeaux Métropole</a></p>\n<p>Dernière mise à jour : {}</p>\n</footer>\n",
        french_datetime(now)
    ));
    html.push_str("</body>\n</html>\n");
    html
}

/// Minimal page served when the schedule cannot be loaded.
pub fn render_error_page() -> String {
    let mut html = String::with_capacity(512);
    html.push_str("<!DOCTYPE html>\n<html lang=\"fr\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<title>Pont Chaban-Delmas - Erreur</title>\n");
    html.push_str("</head>\n<body>\n");
    html.push_str("<h1>Erreur</h1>\n");
    html.push_str("<p>Impossible de récupérer les données du pont pour le moment. Merci de réessayer plus tard.</p>\n");
    html.push_str("</body>\n</html>\n");
    html
}

/// Formats a local datetime the French way, e.g.
/// "dimanche 14 septembre 2025 à 05:45".
fn french_datetime(dt: NaiveDateTime) -> String {
    format!(
        "{} {} {} {} à {:02}:{:02}",
        WEEKDAYS[dt.weekday().num_days_from_monday() as usize],
        dt.day(),
        MONTHS[dt.month() as usize - 1],
        dt.year(),
        dt.hour(),
        dt.minute()
    )
}

/// Derives the webcal subscription URL from the public base URL.
fn webcal_url(base_url: &str) -> String {
    let host = base_url
        .strip_prefix("https://")
        .or_else(|| base_url.strip_prefix("http://"))
        .unwrap_or(base_url);
    format!("webcal://{}/calendar.ics", host.trim_end_matches('/'))
}

/// Escapes text for safe interpolation into HTML.
fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
