use crate::selection::{AlertId, AlertStatus};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;

const CHECKBOX_SELECTOR: &str = "input.alert-checkbox";
const ROW_SELECTOR: &str = "[data-alert-id]";
const TITLE_SELECTOR: &str = ".alert-title";
const CSRF_SELECTOR: &str = "input[name=csrfmiddlewaretoken]";

/// Filters accepted by the alert list page
#[derive(clap::Args, Debug, Clone, Default)]
pub struct PageQuery {
    /// Alert type (stock_bajo, mortalidad_alta, vacuna_pendiente, produccion_baja)
    #[arg(long)]
    pub kind: Option<String>,

    /// Alert level (critica, normal)
    #[arg(long)]
    pub level: Option<String>,

    /// Alert priority (critica, alta, media, baja)
    #[arg(long)]
    pub priority: Option<String>,

    /// Alert state (activa, leida, resuelta)
    #[arg(long)]
    pub state: Option<String>,

    /// Batch identifier
    #[arg(long)]
    pub batch: Option<String>,

    /// Only read (true) or unread (false) alerts
    #[arg(long)]
    pub unread: Option<bool>,

    /// Result page
    #[arg(long)]
    pub page: Option<u32>,
}

impl PageQuery {
    /// Query parameters in the names the page expects
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();

        if let Some(kind) = &self.kind {
            params.push(("tipo", kind.clone()));
        }
        if let Some(level) = &self.level {
            params.push(("nivel", level.clone()));
        }
        if let Some(priority) = &self.priority {
            params.push(("prioridad", priority.clone()));
        }
        if let Some(state) = &self.state {
            params.push(("estado", state.clone()));
        }
        if let Some(batch) = &self.batch {
            params.push(("lote", batch.clone()));
        }
        if let Some(unread) = self.unread {
            // The page filters on the "read" flag
            params.push(("leida", (!unread).to_string()));
        }
        if let Some(page) = self.page {
            params.push(("page", page.to_string()));
        }

        params
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedAlert {
    pub id: AlertId,
    pub title: Option<String>,
    pub status: Option<AlertStatus>,
}

/// What the alert list page renders
#[derive(Debug, Clone, Default)]
pub struct AlertPage {
    pub alerts: Vec<RenderedAlert>,
    pub csrf_token: Option<String>,
}

impl AlertPage {
    /// Parse the server-rendered alert list
    pub fn parse(body: &str) -> anyhow::Result<Self> {
        let document = Html::parse_document(body);

        let checkbox = selector(CHECKBOX_SELECTOR)?;
        let row = selector(ROW_SELECTOR)?;
        let title = selector(TITLE_SELECTOR)?;
        let csrf = selector(CSRF_SELECTOR)?;

        // Row metadata keyed by alert id
        let rows: HashMap<&str, ElementRef> = document
            .select(&row)
            .filter_map(|element| Some((element.value().attr("data-alert-id")?, element)))
            .collect();

        let alerts = document
            .select(&checkbox)
            .filter_map(|element| element.value().attr("value"))
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| {
                let row = rows.get(id);

                RenderedAlert {
                    id: AlertId::new(id),
                    title: row
                        .and_then(|row| row.select(&title).next())
                        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
                        .filter(|text| !text.is_empty()),
                    status: row
                        .and_then(|row| row.value().attr("data-alert-status"))
                        .and_then(AlertStatus::from_page),
                }
            })
            .collect();

        let csrf_token = document
            .select(&csrf)
            .filter_map(|element| element.value().attr("value"))
            .map(str::to_string)
            .find(|token| !token.is_empty());

        Ok(Self { alerts, csrf_token })
    }

    pub fn ids(&self) -> Vec<AlertId> {
        self.alerts.iter().map(|alert| alert.id.clone()).collect()
    }

    pub fn unread(&self) -> usize {
        self.alerts
            .iter()
            .filter(|alert| alert.status == Some(AlertStatus::Active))
            .count()
    }
}

/// Plain text of a pre-rendered HTML fragment, one line per text block
pub fn fragment_text(html: &str) -> String {
    Html::parse_fragment(html)
        .root_element()
        .text()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn selector(css: &str) -> anyhow::Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow::anyhow!("Failed to parse HTML selector: {}", e))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <form><input type="hidden" name="csrfmiddlewaretoken" value="tok-123"></form>
          <input type="checkbox" id="selectAll">
          <div class="alert-list-item" data-alert-id="11" data-alert-status="activa">
            <input type="checkbox" class="alert-checkbox" value="11">
            <h6 class="alert-title">  Stock bajo en
                galpón 2 </h6>
          </div>
          <div class="alert-list-item" data-alert-id="12" data-alert-status="leida">
            <input type="checkbox" class="alert-checkbox" value="12">
          </div>
          <input type="checkbox" class="alert-checkbox" value="13">
        </body></html>
    "#;

    #[test]
    fn parses_rendered_alerts_in_order() {
        let page = AlertPage::parse(PAGE).unwrap();

        assert_eq!(
            page.ids(),
            vec![AlertId::from("11"), AlertId::from("12"), AlertId::from("13")]
        );
        assert_eq!(page.alerts[0].title.as_deref(), Some("Stock bajo en galpón 2"));
        assert_eq!(page.alerts[0].status, Some(AlertStatus::Active));
        assert_eq!(page.alerts[1].status, Some(AlertStatus::Read));
        assert_eq!(page.alerts[2].status, None);
        assert_eq!(page.unread(), 1);
    }

    #[test]
    fn reads_the_csrf_token() {
        let page = AlertPage::parse(PAGE).unwrap();
        assert_eq!(page.csrf_token.as_deref(), Some("tok-123"));

        let page = AlertPage::parse("<html><body></body></html>").unwrap();
        assert!(page.csrf_token.is_none());
        assert!(page.alerts.is_empty());
    }

    #[test]
    fn query_uses_page_parameter_names() {
        let query = PageQuery {
            level: Some("critica".into()),
            priority: Some("alta".into()),
            unread: Some(true),
            page: Some(2),
            ..Default::default()
        };

        assert_eq!(
            query.params(),
            vec![
                ("nivel", "critica".to_string()),
                ("prioridad", "alta".to_string()),
                ("leida", "false".to_string()),
                ("page", "2".to_string()),
            ]
        );
    }

    #[test]
    fn fragment_text_strips_markup() {
        let text = fragment_text("<div><h5>Mortalidad alta</h5><p>Lote   7\n</p></div>");
        assert_eq!(text, "Mortalidad alta\nLote 7");
    }
}
