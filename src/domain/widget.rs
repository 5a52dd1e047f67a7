//! Dashboard Widget Payloads
//!
//! Shared by the dashboard grid and the per-member grid.

use serde::{Deserialize, Serialize};

use super::error::ValidationError;
use super::item::{ItemKind, Payload};

const MAX_TITLE_CHARS: usize = 80;
const MAX_LIMIT: u8 = 50;
const MAX_RANGE_DAYS: u16 = 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetKind {
    Metric,
    Chart,
    Tasks,
    Projects,
    Notes,
    Activity,
}

impl WidgetKind {
    pub const ALL: [WidgetKind; 6] = [
        WidgetKind::Metric,
        WidgetKind::Chart,
        WidgetKind::Tasks,
        WidgetKind::Projects,
        WidgetKind::Notes,
        WidgetKind::Activity,
    ];

    fn default_title(&self) -> &'static str {
        match self {
            WidgetKind::Metric => "Metric",
            WidgetKind::Chart => "Chart",
            WidgetKind::Tasks => "Tasks",
            WidgetKind::Projects => "Projects",
            WidgetKind::Notes => "Notes",
            WidgetKind::Activity => "Recent activity",
        }
    }
}

impl ItemKind for WidgetKind {
    fn as_str(&self) -> &'static str {
        match self {
            WidgetKind::Metric => "metric",
            WidgetKind::Chart => "chart",
            WidgetKind::Tasks => "tasks",
            WidgetKind::Projects => "projects",
            WidgetKind::Notes => "notes",
            WidgetKind::Activity => "activity",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        WidgetKind::ALL.into_iter().find(|kind| kind.as_str() == s)
    }
}

/// Grid footprint of a widget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WidgetSize {
    #[default]
    Small,
    Medium,
    Large,
    Wide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    #[default]
    ActiveProjects,
    OpenTasks,
    OverdueTasks,
    Clients,
    Revenue,
    TeamUtilization,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChartStyle {
    #[default]
    Line,
    Bar,
    Area,
    Pie,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskFilter {
    #[default]
    Assigned,
    DueSoon,
    Overdue,
    All,
}

/// Per-kind widget settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WidgetConfig {
    Metric {
        metric: Metric,
    },
    Chart {
        metric: Metric,
        style: ChartStyle,
        range_days: u16,
    },
    Tasks {
        filter: TaskFilter,
        limit: u8,
    },
    Projects {
        #[serde(default)]
        status: Option<String>,
        limit: u8,
    },
    Notes {
        text: String,
    },
    Activity {
        limit: u8,
    },
}

/// Widget content placed in a grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetPayload {
    pub title: String,
    #[serde(default)]
    pub size: WidgetSize,
    pub config: WidgetConfig,
}

impl WidgetPayload {
    fn limit(&self) -> Option<u8> {
        match &self.config {
            WidgetConfig::Tasks { limit, .. }
            | WidgetConfig::Projects { limit, .. }
            | WidgetConfig::Activity { limit } => Some(*limit),
            _ => None,
        }
    }
}

impl Payload for WidgetPayload {
    type Kind = WidgetKind;

    fn kind(&self) -> WidgetKind {
        match self.config {
            WidgetConfig::Metric { .. } => WidgetKind::Metric,
            WidgetConfig::Chart { .. } => WidgetKind::Chart,
            WidgetConfig::Tasks { .. } => WidgetKind::Tasks,
            WidgetConfig::Projects { .. } => WidgetKind::Projects,
            WidgetConfig::Notes { .. } => WidgetKind::Notes,
            WidgetConfig::Activity { .. } => WidgetKind::Activity,
        }
    }

    fn empty(kind: WidgetKind) -> Self {
        let (size, config) = match kind {
            WidgetKind::Metric => (
                WidgetSize::Small,
                WidgetConfig::Metric {
                    metric: Metric::default(),
                },
            ),
            WidgetKind::Chart => (
                WidgetSize::Wide,
                WidgetConfig::Chart {
                    metric: Metric::default(),
                    style: ChartStyle::default(),
                    range_days: 30,
                },
            ),
            WidgetKind::Tasks => (
                WidgetSize::Medium,
                WidgetConfig::Tasks {
                    filter: TaskFilter::default(),
                    limit: 10,
                },
            ),
            WidgetKind::Projects => (
                WidgetSize::Medium,
                WidgetConfig::Projects {
                    status: None,
                    limit: 10,
                },
            ),
            WidgetKind::Notes => (
                WidgetSize::Medium,
                WidgetConfig::Notes {
                    text: String::new(),
                },
            ),
            WidgetKind::Activity => (WidgetSize::Large, WidgetConfig::Activity { limit: 20 }),
        };
        Self {
            title: kind.default_title().to_string(),
            size,
            config,
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        let kind = self.kind().as_str();
        if self.title.chars().count() > MAX_TITLE_CHARS {
            return Err(ValidationError::new(
                kind,
                format!("title longer than {} characters", MAX_TITLE_CHARS),
            ));
        }
        if let Some(limit) = self.limit() {
            if limit == 0 || limit > MAX_LIMIT {
                return Err(ValidationError::new(
                    kind,
                    format!("limit {} out of range 1-{}", limit, MAX_LIMIT),
                ));
            }
        }
        if let WidgetConfig::Chart { range_days, .. } = self.config {
            if range_days == 0 || range_days > MAX_RANGE_DAYS {
                return Err(ValidationError::new(
                    kind,
                    format!("range of {} days out of range 1-{}", range_days, MAX_RANGE_DAYS),
                ));
            }
        }
        Ok(())
    }
}
