//! Application route table
//!
//! Maps a UI path to what should be shown there: a static page, a report
//! page generated from a template, or a redirect.

use crate::auth::UserContext;
use crate::forms::{FormRegistry, PageType, ReportRoute};
use serde::Serialize;

/// A generated report page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRef {
    pub name: String,
    pub path: String,
    pub page_type: Option<PageType>,
    pub entity_type: Option<String>,
    pub form_ids: Vec<String>,
}

impl PageRef {
    fn from_route(route: &ReportRoute) -> Self {
        Self {
            name: route.name.clone(),
            path: route.path.clone(),
            page_type: route.page_type,
            entity_type: route.entity_type.clone(),
            form_ids: route.forms().map(|f| f.id.clone()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum RouteTarget {
    Home,
    Admin,
    Help,
    Profile,
    Dashboard { report_type: String },
    GetStarted { report_type: String },
    /// Page with a form (`page_type` set)
    ReportPage { report_type: String, page: PageRef },
    /// Page without a form: review and submit
    ReviewSubmit { report_type: String, page: PageRef },
    Redirect { to: String },
    NotFound,
}

#[derive(Debug, Clone)]
struct ReportRoutes {
    report_type: String,
    base_path: String,
    pages: Vec<PageRef>,
}

#[derive(Debug, Clone)]
pub struct RouteTable {
    reports: Vec<ReportRoutes>,
}

fn normalize(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}

impl RouteTable {
    pub fn from_registry(registry: &FormRegistry) -> Self {
        let mut reports: Vec<_> = registry
            .templates()
            .map(|template| ReportRoutes {
                report_type: template.report_type.clone(),
                base_path: template.base_path.clone(),
                pages: template
                    .flat_routes()
                    .into_iter()
                    .map(PageRef::from_route)
                    .collect(),
            })
            .collect();
        reports.sort_by(|a, b| a.base_path.cmp(&b.base_path));
        Self { reports }
    }

    /// Every path the table serves directly
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = ["/", "/admin", "/help", "/profile"]
            .iter()
            .map(|p| p.to_string())
            .collect();
        for report in &self.reports {
            paths.push(report.base_path.clone());
            paths.push(format!("{}/get-started", report.base_path));
            paths.extend(report.pages.iter().map(|p| p.path.clone()));
        }
        paths
    }

    pub fn resolve(&self, path: &str, user: &UserContext) -> RouteTarget {
        let path = normalize(path);
        match path {
            "/" => return RouteTarget::Home,
            "/help" => return RouteTarget::Help,
            "/profile" => return RouteTarget::Profile,
            "/admin" if user.is_admin() => return RouteTarget::Admin,
            "/admin" => {
                return RouteTarget::Redirect {
                    to: "/profile".to_string(),
                }
            }
            _ => {}
        }

        for report in &self.reports {
            let base = report.base_path.as_str();
            if path == base {
                return RouteTarget::Dashboard {
                    report_type: report.report_type.clone(),
                };
            }
            let Some(rest) = path.strip_prefix(base).filter(|r| r.starts_with('/')) else {
                continue;
            };
            if rest == "/get-started" {
                return RouteTarget::GetStarted {
                    report_type: report.report_type.clone(),
                };
            }
            if let Some(page) = report.pages.iter().find(|p| p.path == path) {
                let report_type = report.report_type.clone();
                let page = page.clone();
                return if page.page_type.is_some() {
                    RouteTarget::ReportPage { report_type, page }
                } else {
                    RouteTarget::ReviewSubmit { report_type, page }
                };
            }
            return RouteTarget::Redirect {
                to: base.to_string(),
            };
        }

        RouteTarget::NotFound
    }
}
