use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ecominsight::{
    charts, footer_caption, metrics, DashboardError, FieldKind, FormField, InsightTable,
    PredictionForm, PredictionReport, PredictionRequest, PredictionResponse, SegmentShare,
    SummaryMetrics, APP_SUBTITLE, APP_TITLE, CHURN_RATE_DELTA, PREDICTION_TIP,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        Axis, Bar, BarChart, BarGroup, Block, Borders, Cell, Chart, Dataset, GraphType,
        Paragraph, Row, Table, Wrap,
    },
    Frame, Terminal,
};
use std::io;
use std::sync::Arc;
use tracing::info;

const SEGMENT_COLORS: [Color; 8] = [
    Color::LightCyan,
    Color::LightMagenta,
    Color::LightGreen,
    Color::LightYellow,
    Color::LightBlue,
    Color::LightRed,
    Color::Cyan,
    Color::Magenta,
];

/// What the result panel is showing
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionOutcome {
    Idle,
    Ready(PredictionReport),
    Failed(String),
}

pub struct App {
    pub table: Arc<InsightTable>,
    pub summary: SummaryMetrics,
    pub shares: Vec<SegmentShare>,
    /// Scatter points per segment, ready for the chart widget
    pub scatter: Vec<(String, Vec<(f64, f64)>)>,
    pub scatter_bounds: charts::Bounds,
    pub form: PredictionForm,
    pub outcome: PredictionOutcome,
    pub should_quit: bool,
}

impl App {
    pub fn new(table: Arc<InsightTable>) -> Self {
        let summary = SummaryMetrics::from_table(&table);
        let shares = charts::segment_shares(&table);
        let chart = charts::scatter_chart(&table);
        let scatter_bounds = chart.bounds();
        let scatter = chart
            .series
            .into_iter()
            .map(|s| {
                let points = s.points.iter().map(|p| (p.tenure, p.monetary)).collect();
                (s.segment_name, points)
            })
            .collect();

        Self {
            table,
            summary,
            shares,
            scatter,
            scatter_bounds,
            form: PredictionForm::new(),
            outcome: PredictionOutcome::Idle,
            should_quit: false,
        }
    }

    /// Validate the form and hand the request to `predict`
    ///
    /// Any failure lands in the result panel; the dashboard keeps running.
    pub fn submit<F>(&mut self, predict: F)
    where
        F: FnOnce(&PredictionRequest) -> Result<PredictionResponse, DashboardError>,
    {
        let request = match self.form.to_request() {
            Ok(request) => request,
            Err(err) => {
                self.outcome = PredictionOutcome::Failed(err.to_string());
                return;
            }
        };

        self.outcome = match predict(&request) {
            Ok(response) => {
                info!(score = response.churn_risk_score, will_churn = response.will_churn, "prediction received");
                PredictionOutcome::Ready(PredictionReport::new(&request, &response))
            }
            Err(err) => PredictionOutcome::Failed(err.to_string()),
        };
    }

    /// Apply one key press; returns true when a submit was requested
    pub fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> bool {
        match code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true
            }
            KeyCode::Enter => return true,
            KeyCode::Tab | KeyCode::Down => self.form.focus_next(),
            KeyCode::BackTab | KeyCode::Up => self.form.focus_previous(),
            KeyCode::Left => self.form.adjust(-1),
            KeyCode::Right => self.form.adjust(1),
            KeyCode::Backspace => self.form.backspace(),
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('r') => {
                self.form.reset();
                self.outcome = PredictionOutcome::Idle;
            }
            KeyCode::Char(ch) => self.form.insert(ch),
            _ => {}
        }
        false
    }
}

pub fn run_ui<F>(app: &mut App, predict: F) -> Result<()>
where
    F: FnMut(&PredictionRequest) -> Result<PredictionResponse, DashboardError>,
{
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app, predict);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn run_app<B, F>(terminal: &mut Terminal<B>, app: &mut App, mut predict: F) -> Result<()>
where
    B: ratatui::backend::Backend,
    F: FnMut(&PredictionRequest) -> Result<PredictionResponse, DashboardError>,
{
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if app.handle_key(key.code, key.modifiers) {
                app.submit(&mut predict);
            }
            if app.should_quit {
                return Ok(());
            }
        }
    }
}

fn ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),  // Title
            Constraint::Length(4),  // Metric tiles
            Constraint::Min(12),    // Charts
            Constraint::Length(13), // Prediction form and result
            Constraint::Length(3),  // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0]);
    render_metrics(f, chunks[1], app);

    let chart_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(chunks[2]);
    render_segments(f, chart_chunks[0], app);
    render_scatter(f, chart_chunks[1], app);

    let prediction_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(chunks[3]);
    render_form(f, prediction_chunks[0], app);
    render_result(f, prediction_chunks[1], app);

    render_status_bar(f, chunks[4]);
}

fn render_header(f: &mut Frame, area: Rect) {
    let header = Paragraph::new(vec![
        Line::from(Span::styled(
            APP_TITLE,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(APP_SUBTITLE, Style::default().fg(Color::DarkGray))),
    ])
    .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_metrics(f: &mut Frame, area: Rect, app: &App) {
    let tiles = app.summary.tiles();
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4])
        .split(area);

    for (i, (label, value)) in tiles.into_iter().enumerate() {
        let mut spans = vec![Span::styled(
            value,
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        )];
        if label == "Churn Rate" {
            // Inverse colouring: a falling churn rate is good news
            spans.push(Span::raw("  "));
            spans.push(Span::styled(CHURN_RATE_DELTA, Style::default().fg(Color::Green)));
        }

        let tile = Paragraph::new(Line::from(spans)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(format!(" {} ", label)),
        );
        f.render_widget(tile, columns[i]);
    }
}

fn render_segments(f: &mut Frame, area: Rect, app: &App) {
    let bars: Vec<Bar> = app
        .shares
        .iter()
        .enumerate()
        .map(|(i, share)| {
            Bar::default()
                .value(share.customers as u64)
                .label(Line::from(truncate(&share.segment_name, 10)))
                .text_value(metrics::format_percent(share.share))
                .style(Style::default().fg(segment_color(i)))
        })
        .collect();

    let chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(" Customer Segmentation "),
        )
        .data(BarGroup::default().bars(&bars))
        .bar_width(10)
        .bar_gap(1)
        .value_style(Style::default().fg(Color::Black).add_modifier(Modifier::BOLD));

    f.render_widget(chart, area);
}

fn render_scatter(f: &mut Frame, area: Rect, app: &App) {
    let datasets: Vec<Dataset> = app
        .scatter
        .iter()
        .enumerate()
        .map(|(i, (name, points))| {
            Dataset::default()
                .name(name.clone())
                .marker(Marker::Braille)
                .graph_type(GraphType::Scatter)
                .style(Style::default().fg(segment_color(i)))
                .data(points)
        })
        .collect();

    let bounds = app.scatter_bounds;
    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(" Revenue vs. Tenure "),
        )
        .x_axis(
            Axis::default()
                .title(charts::SCATTER_X_LABEL)
                .style(Style::default().fg(Color::Gray))
                .bounds(bounds.x)
                .labels(axis_labels(bounds.x, |v| format!("{:.0}", v))),
        )
        .y_axis(
            Axis::default()
                .title(charts::SCATTER_Y_LABEL)
                .style(Style::default().fg(Color::Gray))
                .bounds(bounds.y)
                .labels(axis_labels(bounds.y, |v| format!("${:.0}", v))),
        );

    f.render_widget(chart, area);
}

fn render_form(f: &mut Frame, area: Rect, app: &App) {
    let focused = app.form.focused();
    let mut lines = vec![Line::from(Span::styled(
        "Customer Behavior Input",
        Style::default().add_modifier(Modifier::BOLD),
    ))];

    for field in FormField::ALL {
        let is_focused = field == focused;
        let value = app.form.value(field);
        let shown = match field.kind() {
            FieldKind::Slider => format!("{} {}", slider_bar(value), value),
            _ => value.to_string(),
        };

        let label_style = if is_focused {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };

        lines.push(Line::from(vec![
            Span::styled(if is_focused { "→ " } else { "  " }, label_style),
            Span::styled(format!("{:<24}", field.label()), label_style),
            Span::styled(
                if is_focused { format!("{}_", shown) } else { shown },
                Style::default().fg(Color::White),
            ),
        ]));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "  [ Enter ] RUN AI STRATEGY ENGINE",
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )));

    let form = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(" Strategic Prediction & Business Recovery "),
    );

    f.render_widget(form, area);
}

fn render_result(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
        .title(" Strategic Business Metrics ");

    let report = match &app.outcome {
        PredictionOutcome::Idle => {
            let tip = Paragraph::new(PREDICTION_TIP)
                .style(Style::default().fg(Color::LightBlue))
                .wrap(Wrap { trim: true })
                .block(block);
            f.render_widget(tip, area);
            return;
        }
        PredictionOutcome::Failed(message) => {
            let error = Paragraph::new(message.as_str())
                .style(Style::default().fg(Color::Red))
                .wrap(Wrap { trim: true })
                .block(block);
            f.render_widget(error, area);
            return;
        }
        PredictionOutcome::Ready(report) => report,
    };

    let inner = block.inner(area);
    f.render_widget(block, area);

    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Banner
            Constraint::Length(5), // Metrics table
            Constraint::Min(0),    // Decision
        ])
        .split(inner);

    let color = if report.will_churn { Color::Red } else { Color::Green };
    let banner = Paragraph::new(vec![
        Line::from(vec![
            Span::styled(
                format!("{}  ", report.headline()),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                report.score_label(),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            Span::styled("AI Confidence Level: ", Style::default().fg(Color::Gray)),
            Span::styled(
                report.advice.confidence.as_str(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ]),
    ]);
    f.render_widget(banner, parts[0]);

    let rows = report.business_metrics().into_iter().map(|(metric, value)| {
        Row::new(vec![
            Cell::from(metric),
            Cell::from(value).style(Style::default().fg(Color::White)),
        ])
    });
    let table = Table::new(rows, [Constraint::Length(26), Constraint::Min(10)])
        .header(
            Row::new(vec!["Metric", "Value"])
                .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
        );
    f.render_widget(table, parts[1]);

    let decision_color = if report.will_churn { Color::Yellow } else { Color::LightBlue };
    let decision = Paragraph::new(format!("Decision: {}", report.decision()))
        .style(Style::default().fg(decision_color))
        .wrap(Wrap { trim: true });
    f.render_widget(decision, parts[2]);
}

fn render_status_bar(f: &mut Frame, area: Rect) {
    let status_spans = vec![
        Span::styled("Tab/↑↓", Style::default().fg(Color::Yellow)),
        Span::raw(" Field | "),
        Span::styled("←/→", Style::default().fg(Color::Yellow)),
        Span::raw(" Slider | "),
        Span::styled("Enter", Style::default().fg(Color::Yellow)),
        Span::raw(" Predict | "),
        Span::styled("r", Style::default().fg(Color::Yellow)),
        Span::raw(" Reset | "),
        Span::styled("q/Esc", Style::default().fg(Color::Yellow)),
        Span::raw(" Quit  "),
        Span::styled(footer_caption(), Style::default().fg(Color::DarkGray)),
    ];

    let status = Paragraph::new(Line::from(status_spans))
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::DarkGray)));

    f.render_widget(status, area);
}

fn segment_color(index: usize) -> Color {
    SEGMENT_COLORS[index % SEGMENT_COLORS.len()]
}

fn axis_labels(bounds: [f64; 2], fmt: impl Fn(f64) -> String) -> Vec<Span<'static>> {
    let mid = (bounds[0] + bounds[1]) / 2.0;
    vec![
        Span::raw(fmt(bounds[0])),
        Span::raw(fmt(mid)),
        Span::raw(fmt(bounds[1])),
    ]
}

fn slider_bar(value: &str) -> String {
    let fraction: f64 = value.parse().unwrap_or(0.0);
    let filled = (fraction.clamp(0.0, 1.0) * 10.0).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(10 - filled))
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{}…", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecominsight::CustomerInsight;
    use ratatui::backend::TestBackend;

    fn sample_app() -> App {
        let rows = vec![
            CustomerInsight {
                tenure: 120.0,
                monetary: 300.0,
                frequency: 9.0,
                segment_name: "Champions".to_string(),
                is_churned: false,
            },
            CustomerInsight {
                tenure: 15.0,
                monetary: 45.0,
                frequency: 1.0,
                segment_name: "At Risk".to_string(),
                is_churned: true,
            },
        ];
        App::new(Arc::new(InsightTable::new(rows)))
    }

    #[test]
    fn test_submit_success_builds_report() {
        let mut app = sample_app();
        app.submit(|request| {
            assert_eq!(request.frequency, 5);
            Ok(PredictionResponse {
                churn_risk_score: 0.92,
                will_churn: true,
            })
        });

        match &app.outcome {
            PredictionOutcome::Ready(report) => {
                assert_eq!(report.headline(), "HIGH CHURN RISK");
                assert_eq!(report.business_metrics()[0].1, "$230.00");
            }
            other => panic!("expected report, got {other:?}"),
        }
    }

    #[test]
    fn test_submit_failure_is_shown_inline() {
        let mut app = sample_app();
        app.submit(|_| Err(DashboardError::Prediction("connection refused".to_string())));
        assert_eq!(
            app.outcome,
            PredictionOutcome::Failed("API Connection Error: connection refused".to_string())
        );
        assert!(!app.should_quit);
    }

    #[test]
    fn test_invalid_form_never_calls_service() {
        let mut app = sample_app();
        app.form.backspace();
        app.submit(|_| panic!("service must not be called"));
        assert!(matches!(app.outcome, PredictionOutcome::Failed(_)));
    }

    #[test]
    fn test_key_handling() {
        let mut app = sample_app();
        assert!(!app.handle_key(KeyCode::Tab, KeyModifiers::NONE));
        assert_eq!(app.form.focused(), FormField::Monetary);
        assert!(app.handle_key(KeyCode::Enter, KeyModifiers::NONE));

        app.outcome = PredictionOutcome::Failed("boom".to_string());
        app.handle_key(KeyCode::Char('r'), KeyModifiers::NONE);
        assert_eq!(app.outcome, PredictionOutcome::Idle);

        app.handle_key(KeyCode::Esc, KeyModifiers::NONE);
        assert!(app.should_quit);
    }

    #[test]
    fn test_dashboard_renders() {
        let mut app = sample_app();
        let backend = TestBackend::new(140, 40);
        let mut terminal = Terminal::new(backend).unwrap();

        terminal.draw(|f| ui(f, &app)).unwrap();
        app.submit(|_| {
            Ok(PredictionResponse {
                churn_risk_score: 0.1,
                will_churn: false,
            })
        });
        terminal.draw(|f| ui(f, &app)).unwrap();

        let buffer = terminal.backend().buffer().clone();
        let text: String = buffer.content().iter().map(|c| c.symbol()).collect();
        assert!(text.contains("LOYAL PROFILE"));
        assert!(text.contains("Total Customers"));
    }

    #[test]
    fn test_helpers() {
        assert_eq!(slider_bar("0.5"), "[#####-----]");
        assert_eq!(slider_bar("junk"), "[----------]");
        assert_eq!(truncate("Hibernating", 6), "Hiber…");
        assert_eq!(truncate("Lost", 6), "Lost");
    }
}
