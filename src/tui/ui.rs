use crate::collector::queries::EXAMPLE_QUERIES;
use crate::model::{
    MetricsSnapshot, SystemResourceSnapshot,
    metrics::truncate_display,
};
use crate::monitor::{
    aggregate::{self, LEADERBOARD_SIZE, SYSTEM_EVENTS_SIZE, UNKNOWN_GROUP, USER_DISTRIBUTION_SIZE},
    store::Feed,
    view::Tab,
};
use crate::tui::app::App;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        Axis, BarChart, Block, Borders, Cell, Chart, Dataset, Gauge, GraphType, Paragraph, Row,
        Table, Tabs, Wrap,
    },
};

const NOT_AVAILABLE: &str = "n/a";
const SQL_TEXT_WIDTH: usize = 60;
const RESULT_CELL_WIDTH: usize = 40;

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(4), // Header
            Constraint::Length(3), // Tabs
            Constraint::Min(0),    // View
            Constraint::Length(3), // Footer / Status
        ])
        .split(f.area());

    if let Some(chunk) = chunks.first() {
        draw_header(f, app, *chunk);
    }
    if let Some(chunk) = chunks.get(1) {
        draw_tabs(f, app, *chunk);
    }
    if let Some(chunk) = chunks.get(2) {
        draw_view(f, app, *chunk);
    }
    if let Some(chunk) = chunks.get(3) {
        draw_footer(f, app, *chunk);
    }
}

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let metrics = app.store.metrics();
    let resources = app.store.resources();

    let identity = metrics.current.as_deref().map_or_else(
        || "Database: connecting...".to_string(),
        |m| {
            let db = &m.database;
            let captured = m.captured_at().map_or_else(
                || m.timestamp.clone().unwrap_or_else(|| NOT_AVAILABLE.into()),
                |t| t.format("%Y-%m-%d %H:%M:%S").to_string(),
            );
            format!(
                "Database: {} | Mode: {} | Log: {} | Captured: {captured}",
                db.name.as_deref().unwrap_or(NOT_AVAILABLE),
                db.open_mode.as_deref().unwrap_or(NOT_AVAILABLE),
                db.log_mode.as_deref().unwrap_or(NOT_AVAILABLE),
            )
        },
    );

    let lines = vec![
        Line::from(format!("{identity} | SQL limit: {}", app.view.sql_limit)),
        Line::from(vec![
            feed_status("Metrics", &metrics),
            Span::raw(" | "),
            feed_status("Resources", &resources),
        ]),
    ];

    let header = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("oramon - {}", app.collector_url)),
    );
    f.render_widget(header, area);
}

fn feed_status<T>(name: &str, feed: &Feed<T>) -> Span<'static> {
    if let Some(stale) = &feed.stale {
        Span::styled(
            format!(
                "{name}: stale since {} ({})",
                stale.since.format("%H:%M:%S"),
                stale.message
            ),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )
    } else if feed.is_loading() {
        Span::styled(
            format!("{name}: loading..."),
            Style::default().fg(Color::Yellow),
        )
    } else {
        let at = feed
            .published_at
            .map_or_else(String::new, |t| t.format("%H:%M:%S").to_string());
        Span::styled(
            format!("{name}: updated {at} (#{})", feed.version),
            Style::default().fg(Color::Green),
        )
    }
}

fn draw_tabs(f: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<String> = Tab::ALL
        .iter()
        .map(|t| format!("{}:{}", t.index() + 1, t.label()))
        .collect();
    let tabs = Tabs::new(titles)
        .block(Block::default().borders(Borders::ALL).title("Views"))
        .select(app.view.tab.index())
        .style(Style::default().fg(Color::Cyan))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );
    f.render_widget(tabs, area);
}

fn draw_view(f: &mut Frame, app: &App, area: Rect) {
    match app.view.tab {
        Tab::SqlQuery => draw_sql_query(f, app, area),
        Tab::Resources => match app.store.current_resources() {
            Some(resources) => draw_resources(f, &resources, area),
            None => draw_placeholder(f, &app.store.resources(), app.view.tab, area),
        },
        tab => {
            let Some(snapshot) = app.store.current_metrics() else {
                draw_placeholder(f, &app.store.metrics(), tab, area);
                return;
            };
            match tab {
                Tab::Sessions => draw_sessions(f, app, &snapshot, area),
                Tab::ActiveSql => draw_active_sql(f, app, &snapshot, area),
                Tab::TableStats => draw_table_stats(f, app, &snapshot, area),
                Tab::Performance => draw_performance(f, app, &snapshot, area),
                Tab::Storage => draw_storage(f, app, &snapshot, area),
                _ => draw_overview(f, app, &snapshot, area),
            }
        }
    }
}

/// Nothing published yet: loading, or the first poll already failed.
fn draw_placeholder<T>(f: &mut Frame, feed: &Feed<T>, tab: Tab, area: Rect) {
    let (text, style) = match &feed.stale {
        Some(stale) => (
            format!("No data available: {}", stale.message),
            Style::default().fg(Color::Red),
        ),
        None => ("Loading...".to_string(), Style::default().fg(Color::Yellow)),
    };
    let placeholder = Paragraph::new(text)
        .style(style)
        .block(Block::default().borders(Borders::ALL).title(tab.label()));
    f.render_widget(placeholder, area);
}

// ---- Overview ----

fn draw_overview(f: &mut Frame, app: &App, m: &MetricsSnapshot, area: Rect) {
    let [cards, lower] =
        Layout::vertical([Constraint::Length(4), Constraint::Min(0)]).areas(area);
    let [c1, c2, c3, c4] = Layout::horizontal([Constraint::Ratio(1, 4); 4]).areas(cards);

    let host_cpu = app
        .store
        .current_resources()
        .and_then(|r| r.cpu.host_utilization());

    let trend = app
        .store
        .metrics()
        .previous
        .map(|prev| match m.active_sessions - prev.active_sessions {
            0 => String::new(),
            d => format!(" ({d:+})"),
        })
        .unwrap_or_default();
    draw_card(
        f,
        c1,
        "Sessions",
        format!(
            "{} active{trend} / {} total",
            m.active_sessions, m.total_sessions
        ),
    );
    draw_card(f, c2, "Host CPU", opt(host_cpu, 1, "%"));
    draw_card(f, c3, "Long-running SQL", m.long_running_sql.len().to_string());
    draw_card(f, c4, "Alerts", m.alerts.len().to_string());

    let [waits, right] =
        Layout::horizontal([Constraint::Percentage(40), Constraint::Percentage(60)]).areas(lower);
    let [long_running, alerts] =
        Layout::vertical([Constraint::Percentage(60), Constraint::Percentage(40)]).areas(right);

    let rows = m
        .wait_events
        .iter()
        .map(|w| vec![w.event.clone(), count(w.count)])
        .collect();
    f.render_widget(
        simple_table(
            "Current Wait Events",
            &["Event", "Sessions"],
            rows,
            vec![Constraint::Fill(1), Constraint::Length(9)],
            None,
        ),
        waits,
    );

    let rows = m
        .long_running_sql
        .iter()
        .map(|s| {
            vec![
                s.sql_id.clone(),
                s.start_time.clone().unwrap_or_default(),
                opt(s.elapsed_sec, 2, ""),
                opt(s.cpu_sec, 2, ""),
                opt_count(s.buffer_gets),
                opt_count(s.disk_reads),
                s.status.clone().unwrap_or_default(),
            ]
        })
        .collect();
    f.render_widget(
        simple_table(
            "Long-running SQL",
            &["SQL ID", "Start", "Elapsed s", "CPU s", "Gets", "Reads", "Status"],
            rows,
            vec![
                Constraint::Length(14),
                Constraint::Length(20),
                Constraint::Length(10),
                Constraint::Length(10),
                Constraint::Length(12),
                Constraint::Length(10),
                Constraint::Fill(1),
            ],
            None,
        ),
        long_running,
    );

    let lines: Vec<Line> = if m.alerts.is_empty() {
        vec![Line::from(Span::styled(
            "No alerts",
            Style::default().fg(Color::Green),
        ))]
    } else {
        m.alerts
            .iter()
            .map(|a| {
                let level = a.level.as_deref().unwrap_or("INFO");
                let color = match level {
                    "CRITICAL" | "ERROR" => Color::Red,
                    "WARNING" => Color::Yellow,
                    _ => Color::Gray,
                };
                Line::from(vec![
                    Span::styled(format!("[{level}] "), Style::default().fg(color)),
                    Span::raw(a.timestamp.as_deref().map_or_else(String::new, |t| format!("{t} "))),
                    Span::raw(a.message.clone()),
                ])
            })
            .collect()
    };
    f.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title("Alerts")),
        alerts,
    );
}

fn draw_card(f: &mut Frame, area: Rect, title: &str, value: String) {
    let card = Paragraph::new(Span::styled(
        value,
        Style::default().add_modifier(Modifier::BOLD),
    ))
    .block(Block::default().borders(Borders::ALL).title(title.to_string()));
    f.render_widget(card, area);
}

// ---- Sessions ----

fn draw_sessions(f: &mut Frame, app: &App, m: &MetricsSnapshot, area: Rect) {
    let [top, bottom] =
        Layout::vertical([Constraint::Percentage(40), Constraint::Percentage(60)]).areas(area);
    let [users, distribution] =
        Layout::horizontal([Constraint::Percentage(60), Constraint::Percentage(40)]).areas(top);

    let rows = aggregate::top_users_by_sessions(m, LEADERBOARD_SIZE)
        .into_iter()
        .map(|u| {
            vec![
                or_unknown(u.username.as_deref()),
                u.osuser.clone().unwrap_or_default(),
                u.machine.clone().unwrap_or_default(),
                u.program.clone().unwrap_or_default(),
                count(u.session_count),
                count(u.active_count),
                count(u.physical_reads),
                count(u.block_gets + u.consistent_gets),
                secs(u.cpu_sec),
            ]
        })
        .collect();
    f.render_widget(
        simple_table(
            "Top Users by Sessions",
            &[
                "User", "OS User", "Machine", "Program", "Sessions", "Active", "Reads", "Gets",
                "CPU s",
            ],
            rows,
            vec![
                Constraint::Length(14),
                Constraint::Length(12),
                Constraint::Length(16),
                Constraint::Fill(1),
                Constraint::Length(9),
                Constraint::Length(7),
                Constraint::Length(10),
                Constraint::Length(12),
                Constraint::Length(9),
            ],
            None,
        ),
        users,
    );

    let bars: Vec<(String, u64)> = aggregate::top_users_by_sessions(m, USER_DISTRIBUTION_SIZE)
        .into_iter()
        .map(|u| {
            (
                or_unknown(u.username.as_deref()),
                u64::try_from(u.session_count).unwrap_or(0),
            )
        })
        .collect();
    draw_bars(f, distribution, "Session Distribution", &bars);

    let active = aggregate::active_sessions(m);
    let rows = active
        .iter()
        .map(|s| {
            vec![
                s.sid.to_string(),
                s.serial.to_string(),
                or_unknown(s.username.as_deref()),
                s.status.clone(),
                s.event.clone().unwrap_or_default(),
                secs(s.wait_sec),
                secs(s.cpu_sec),
                count(s.physical_reads),
                s.program.clone().unwrap_or_default(),
            ]
        })
        .collect();
    f.render_widget(
        simple_table(
            &format!("Active Sessions ({})", active.len()),
            &[
                "SID", "Serial", "User", "Status", "Event", "Wait s", "CPU s", "Reads", "Program",
            ],
            rows,
            vec![
                Constraint::Length(7),
                Constraint::Length(7),
                Constraint::Length(14),
                Constraint::Length(8),
                Constraint::Length(28),
                Constraint::Length(9),
                Constraint::Length(9),
                Constraint::Length(12),
                Constraint::Fill(1),
            ],
            Some(app.selected_row),
        ),
        bottom,
    );
}

// ---- Active SQL ----

fn draw_active_sql(f: &mut Frame, app: &App, m: &MetricsSnapshot, area: Rect) {
    let [top, bottom] =
        Layout::vertical([Constraint::Percentage(40), Constraint::Percentage(60)]).areas(area);
    let [by_cpu, by_execs, scatter] = Layout::horizontal([Constraint::Ratio(1, 3); 3]).areas(top);

    let rows = aggregate::top_sql_by_cpu(m, LEADERBOARD_SIZE)
        .into_iter()
        .map(|s| {
            vec![
                s.sql_id.clone(),
                secs(s.cpu_sec),
                s.display_text(30).into_owned(),
            ]
        })
        .collect();
    f.render_widget(
        simple_table(
            "Top SQL by CPU",
            &["SQL ID", "CPU s", "SQL"],
            rows,
            vec![Constraint::Length(14), Constraint::Length(10), Constraint::Fill(1)],
            None,
        ),
        by_cpu,
    );

    let rows = aggregate::top_sql_by_executions(m, LEADERBOARD_SIZE)
        .into_iter()
        .map(|s| {
            vec![
                s.sql_id.clone(),
                opt_count(s.executions),
                s.display_text(30).into_owned(),
            ]
        })
        .collect();
    f.render_widget(
        simple_table(
            "Top SQL by Executions",
            &["SQL ID", "Execs", "SQL"],
            rows,
            vec![Constraint::Length(14), Constraint::Length(12), Constraint::Fill(1)],
            None,
        ),
        by_execs,
    );

    draw_sql_scatter(f, m, scatter);

    let rows = m
        .active_sql
        .iter()
        .map(|s| {
            vec![
                s.sql_id.clone(),
                s.parsing_schema.clone().unwrap_or_default(),
                opt_count(s.executions),
                secs(s.elapsed_sec),
                secs(s.cpu_sec),
                count(s.buffer_gets),
                count(s.disk_reads),
                count(s.rows_processed),
                s.display_text(SQL_TEXT_WIDTH).into_owned(),
            ]
        })
        .collect();
    f.render_widget(
        simple_table(
            &format!(
                "Active SQL ({} statements, limit {})",
                m.active_sql.len(),
                app.view.sql_limit
            ),
            &[
                "SQL ID", "Schema", "Execs", "Elapsed s", "CPU s", "Gets", "Reads", "Rows", "SQL",
            ],
            rows,
            vec![
                Constraint::Length(14),
                Constraint::Length(12),
                Constraint::Length(10),
                Constraint::Length(10),
                Constraint::Length(10),
                Constraint::Length(12),
                Constraint::Length(10),
                Constraint::Length(10),
                Constraint::Fill(1),
            ],
            Some(app.selected_row),
        ),
        bottom,
    );
}

/// Executions against CPU; statements with above-average elapsed time are
/// drawn in red.
#[allow(clippy::cast_precision_loss)]
fn draw_sql_scatter(f: &mut Frame, m: &MetricsSnapshot, area: Rect) {
    let points = aggregate::sql_scatter(m);
    let mean_z = if points.is_empty() {
        0.0
    } else {
        points.iter().map(|p| p.z).sum::<f64>() / points.len() as f64
    };
    let (heavy, light): (Vec<(f64, f64)>, Vec<(f64, f64)>) = {
        let (h, l): (Vec<_>, Vec<_>) = points.iter().partition(|p| p.z > mean_z);
        (
            h.iter().map(|p| (p.x, p.y)).collect(),
            l.iter().map(|p| (p.x, p.y)).collect(),
        )
    };
    let max_x = points.iter().map(|p| p.x).fold(1.0, f64::max);
    let max_y = points.iter().map(|p| p.y).fold(1.0, f64::max);

    let datasets = vec![
        Dataset::default()
            .name("elapsed <= avg")
            .marker(Marker::Braille)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(Color::Cyan))
            .data(&light),
        Dataset::default()
            .name("elapsed > avg")
            .marker(Marker::Braille)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(Color::Red))
            .data(&heavy),
    ];
    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("CPU vs Executions"),
        )
        .x_axis(
            Axis::default()
                .title("Execs")
                .bounds([0.0, max_x])
                .labels(["0".to_string(), format!("{max_x:.0}")]),
        )
        .y_axis(
            Axis::default()
                .title("CPU s")
                .bounds([0.0, max_y])
                .labels(["0".to_string(), format!("{max_y:.1}")]),
        );
    f.render_widget(chart, area);
}

// ---- Table statistics ----

fn draw_table_stats(f: &mut Frame, app: &App, m: &MetricsSnapshot, area: Rect) {
    let [totals_area, top, bottom] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Percentage(40),
        Constraint::Min(0),
    ])
    .areas(area);
    let [by_rows, by_blocks, spread] =
        Layout::horizontal([Constraint::Ratio(1, 3); 3]).areas(top);

    let totals = aggregate::table_totals(m);
    let summary = format!(
        "Tables: {} | Rows: {} | Blocks: {} | Analyzed: {} ({})",
        totals.tables,
        count(totals.rows),
        count(totals.blocks),
        totals.analyzed,
        opt(totals.analyzed_pct, 1, "%"),
    );
    f.render_widget(
        Paragraph::new(summary).block(Block::default().borders(Borders::ALL).title("Totals")),
        totals_area,
    );

    let rows = aggregate::top_tables_by_rows(m, LEADERBOARD_SIZE)
        .into_iter()
        .map(|t| vec![t.table_name.clone(), count(t.num_rows)])
        .collect();
    f.render_widget(
        simple_table(
            "Largest Tables by Rows",
            &["Table", "Rows"],
            rows,
            vec![Constraint::Fill(1), Constraint::Length(14)],
            None,
        ),
        by_rows,
    );

    let rows = aggregate::top_tables_by_blocks(m, LEADERBOARD_SIZE)
        .into_iter()
        .map(|t| vec![t.table_name.clone(), count(t.blocks)])
        .collect();
    f.render_widget(
        simple_table(
            "Largest Tables by Blocks",
            &["Table", "Blocks"],
            rows,
            vec![Constraint::Fill(1), Constraint::Length(12)],
            None,
        ),
        by_blocks,
    );

    let bars: Vec<(String, u64)> = aggregate::tablespace_distribution(m)
        .into_iter()
        .map(|(name, n)| (name, u64::try_from(n).unwrap_or(u64::MAX)))
        .collect();
    draw_bars(f, spread, "Tables per Tablespace", &bars);

    let rows = m
        .table_stats
        .iter()
        .map(|t| {
            vec![
                t.table_name.clone(),
                or_unknown(t.tablespace.as_deref()),
                count(t.num_rows),
                count(t.blocks),
                count(t.avg_row_len),
                t.last_analyzed.clone().unwrap_or_else(|| "never".into()),
            ]
        })
        .collect();
    f.render_widget(
        simple_table(
            "Table Statistics",
            &["Table", "Tablespace", "Rows", "Blocks", "Avg Row Len", "Last Analyzed"],
            rows,
            vec![
                Constraint::Fill(1),
                Constraint::Length(16),
                Constraint::Length(14),
                Constraint::Length(12),
                Constraint::Length(12),
                Constraint::Length(20),
            ],
            Some(app.selected_row),
        ),
        bottom,
    );
}

// ---- SQL query ----

fn draw_sql_query(f: &mut Frame, app: &App, area: Rect) {
    let [editor_area, results_area] =
        Layout::vertical([Constraint::Length(8), Constraint::Min(0)]).areas(area);
    let [editor, examples] =
        Layout::horizontal([Constraint::Percentage(70), Constraint::Percentage(30)])
            .areas(editor_area);

    let (title, border) = if app.editing {
        (
            "Editing (Enter: run, Alt+Enter: newline, Esc: leave editor)",
            Style::default().fg(Color::Yellow),
        )
    } else {
        (
            "Query (e: edit, Enter: run, n: next example, c: clear)",
            Style::default(),
        )
    };
    let mut text = app.panel.input.clone();
    if app.editing {
        text.push('_');
    }
    f.render_widget(
        Paragraph::new(text).wrap(Wrap { trim: false }).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border)
                .title(title),
        ),
        editor,
    );

    let lines: Vec<Line> = EXAMPLE_QUERIES
        .iter()
        .enumerate()
        .map(|(i, q)| {
            let style = if i == app.next_example {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };
            Line::from(Span::styled(q.name, style))
        })
        .collect();
    f.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Examples (n)")),
        examples,
    );

    if app.panel.is_running() {
        f.render_widget(
            Paragraph::new("Running query...")
                .style(Style::default().fg(Color::Yellow))
                .block(Block::default().borders(Borders::ALL).title("Results")),
            results_area,
        );
    } else if let Some(error) = app.panel.error() {
        f.render_widget(
            Paragraph::new(error.to_string())
                .style(Style::default().fg(Color::Red))
                .wrap(Wrap { trim: true })
                .block(Block::default().borders(Borders::ALL).title("Error")),
            results_area,
        );
    } else if let Some(result) = app.panel.result().filter(|r| !r.is_empty()) {
        let header: Vec<&str> = result.columns().iter().map(String::as_str).collect();
        let rows = result.rows().iter().enumerate().map(|(i, row)| {
            let style = if i == app.selected_row {
                Style::default().fg(Color::Black).bg(Color::White)
            } else {
                Style::default()
            };
            Row::new(result.cells(row).map(|cell| {
                let text = truncate_display(&cell.to_text(), RESULT_CELL_WIDTH).into_owned();
                if cell.is_null() {
                    Cell::from(text).style(Style::default().fg(Color::DarkGray))
                } else {
                    Cell::from(text)
                }
            }))
            .style(style)
        });
        let table = Table::new(rows, vec![Constraint::Fill(1); header.len().max(1)])
            .header(header_row(&header))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("Results: {}", result.summary())),
            );
        f.render_widget(table, results_area);
    } else if let Some(result) = app.panel.result() {
        f.render_widget(
            Paragraph::new(format!("Columns: {}", result.columns().join(", ")))
                .block(Block::default().borders(Borders::ALL).title(result.summary())),
            results_area,
        );
    } else {
        f.render_widget(
            Paragraph::new("Only SELECT statements are accepted.")
                .block(Block::default().borders(Borders::ALL).title("Results")),
            results_area,
        );
    }
}

// ---- Performance ----

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn draw_performance(f: &mut Frame, app: &App, m: &MetricsSnapshot, area: Rect) {
    let [top, bottom] =
        Layout::vertical([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(area);
    let [chart, sga] =
        Layout::horizontal([Constraint::Percentage(60), Constraint::Percentage(40)]).areas(bottom);

    let events = aggregate::top_system_events(m, SYSTEM_EVENTS_SIZE);
    let rows = events
        .iter()
        .map(|e| {
            vec![
                e.event.event.clone(),
                count(e.event.total_waits),
                e.event
                    .total_timeouts
                    .map_or_else(|| NOT_AVAILABLE.to_string(), count),
                opt(e.time_waited_ms, 0, ""),
                opt(e.avg_wait_ms, 2, ""),
            ]
        })
        .collect();
    f.render_widget(
        simple_table(
            "Top System Wait Events",
            &["Event", "Waits", "Timeouts", "Time Waited ms", "Avg Wait ms"],
            rows,
            vec![
                Constraint::Fill(1),
                Constraint::Length(14),
                Constraint::Length(12),
                Constraint::Length(16),
                Constraint::Length(12),
            ],
            Some(app.selected_row),
        ),
        top,
    );

    let bars: Vec<(String, u64)> = events
        .iter()
        .map(|e| {
            let ms = e.time_waited_ms.unwrap_or_default().max(0.0).round() as u64;
            (e.event.event.clone(), ms)
        })
        .collect();
    draw_bars(f, chart, "Time Waited (ms)", &bars);

    let rows = m
        .sga_stats
        .iter()
        .map(|s| vec![s.component.clone(), opt(s.size_mb, 1, "")])
        .collect();
    f.render_widget(
        simple_table(
            "SGA Components",
            &["Component", "Size MB"],
            rows,
            vec![Constraint::Fill(1), Constraint::Length(10)],
            None,
        ),
        sga,
    );
}

// ---- Storage ----

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn draw_storage(f: &mut Frame, app: &App, m: &MetricsSnapshot, area: Rect) {
    const BAR_WIDTH: usize = 20;

    let rows: Vec<Row> = aggregate::tablespaces_by_usage(m)
        .into_iter()
        .enumerate()
        .map(|(i, t)| {
            let pct = t.pct_used.unwrap_or_default().clamp(0.0, 100.0);
            let filled = (pct / 100.0 * BAR_WIDTH as f64).round() as usize;
            let bar = format!(
                "{}{}",
                "█".repeat(filled),
                " ".repeat(BAR_WIDTH.saturating_sub(filled))
            );
            let color = t.pct_used.map_or(Color::Gray, usage_color);
            let style = if i == app.selected_row {
                Style::default().fg(Color::Black).bg(Color::White)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(t.name.clone()),
                Cell::from(opt(t.used_mb, 1, "")),
                Cell::from(opt(t.total_mb, 1, "")),
                Cell::from(opt(t.pct_used, 1, "%")).style(Style::default().fg(color)),
                Cell::from(bar).style(Style::default().fg(color)),
            ])
            .style(style)
        })
        .collect();

    let table = Table::new(
        rows,
        vec![
            Constraint::Fill(1),
            Constraint::Length(12),
            Constraint::Length(12),
            Constraint::Length(8),
            Constraint::Length(22),
        ],
    )
    .header(header_row(&["Tablespace", "Used MB", "Total MB", "Used", ""]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title("Tablespace Usage"),
    );
    f.render_widget(table, area);
}

fn usage_color(pct: f64) -> Color {
    if pct >= 90.0 {
        Color::Red
    } else if pct >= 75.0 {
        Color::Yellow
    } else {
        Color::Green
    }
}

// ---- System resources ----

fn draw_resources(f: &mut Frame, r: &SystemResourceSnapshot, area: Rect) {
    let [cpu_area, io_area, details] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Min(0),
    ])
    .areas(area);
    let [reads_area, writes_area] =
        Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)])
            .areas(io_area);
    let [cpu_details, memory_details, pools] =
        Layout::horizontal([Constraint::Ratio(1, 3); 3]).areas(details);

    f.render_widget(
        percent_gauge("Host CPU Utilization", r.cpu.host_utilization()),
        cpu_area,
    );

    let split = aggregate::io_split(&r.io);
    f.render_widget(
        percent_gauge("Physical Reads", split.map(|(reads, _)| reads)),
        reads_area,
    );
    f.render_widget(
        percent_gauge("Physical Writes", split.map(|(_, writes)| writes)),
        writes_area,
    );

    let breakdown = aggregate::cpu_breakdown(&r.cpu);
    let cpu_lines = vec![
        kv("Captured", r.timestamp.as_deref().unwrap_or(NOT_AVAILABLE).to_string()),
        kv("CPU cores", opt(r.cpu.cores(), 0, "")),
        kv("Instance CPU", opt(r.cpu.utilization_pct, 1, "%")),
        kv("CPU usage/s", opt(r.cpu.cpu_usage_per_sec, 2, "")),
        kv("Busy / idle time", format!(
            "{} / {}",
            opt(r.cpu.busy_time, 0, ""),
            opt(r.cpu.idle_time, 0, "")
        )),
        kv("DB time", opt(r.cpu.db_time_sec, 1, " s")),
        kv("DB CPU time ratio", opt(r.cpu.db_cpu_time_ratio, 1, "%")),
        kv("DB CPU share", opt(breakdown.map(|(db, _)| db), 1, "%")),
        kv(
            "Background CPU share",
            opt(breakdown.and_then(|(_, bg)| bg), 1, "%"),
        ),
        kv("Load average", opt(r.load.load_average, 2, "")),
    ];
    f.render_widget(
        Paragraph::new(cpu_lines).block(Block::default().borders(Borders::ALL).title("CPU")),
        cpu_details,
    );

    let memory_lines = vec![
        kv("Physical memory", opt(r.memory.physical_memory_gb, 1, " GB")),
        kv("SGA total", opt(r.memory.total_sga_mb, 1, " MB")),
        kv("PGA allocated", opt(r.memory.pga_allocated_mb, 1, " MB")),
        kv("PGA in use", opt(r.memory.pga_inuse_mb, 1, " MB")),
        kv("PGA max allocated", opt(r.memory.pga_max_allocated_mb, 1, " MB")),
        kv("I/O throughput", opt(r.io.io_mb_per_sec, 2, " MB/s")),
        kv("I/O requests", opt(r.io.io_requests_per_sec, 1, "/s")),
        kv("Read bytes", opt(r.io.read_bytes_per_sec, 0, " B/s")),
        kv("Write bytes", opt(r.io.write_bytes_per_sec, 0, " B/s")),
    ];
    f.render_widget(
        Paragraph::new(memory_lines)
            .block(Block::default().borders(Borders::ALL).title("Memory & I/O")),
        memory_details,
    );

    let rows = aggregate::sga_pool_shares(&r.memory)
        .into_iter()
        .map(|p| {
            vec![
                p.pool.to_string(),
                format!("{:.1}", p.size_mb),
                opt(p.pct, 1, "%"),
            ]
        })
        .collect();
    f.render_widget(
        simple_table(
            "SGA Pools",
            &["Pool", "Size MB", "Share"],
            rows,
            vec![
                Constraint::Fill(1),
                Constraint::Length(10),
                Constraint::Length(8),
            ],
            None,
        ),
        pools,
    );
}

fn percent_gauge(title: &str, pct: Option<f64>) -> Gauge<'static> {
    let block = Block::default().borders(Borders::ALL).title(title.to_string());
    match pct.filter(|p| p.is_finite()) {
        Some(p) => Gauge::default()
            .block(block)
            .gauge_style(Style::default().fg(usage_color(p)))
            .ratio((p / 100.0).clamp(0.0, 1.0))
            .label(format!("{p:.1}%")),
        None => Gauge::default().block(block).ratio(0.0).label(NOT_AVAILABLE),
    }
}

fn kv(key: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{key}: "), Style::default().fg(Color::Cyan)),
        Span::raw(value),
    ])
}

// ---- Footer ----

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let help = format!(
        "q:Quit | 1-8/Tab:Switch View | r:Refresh | +/-:SQL Limit ({}) | ↑↓:Navigate",
        app.view.sql_limit
    );
    let snapshot = app.store.current_metrics();
    let detail = match (app.view.tab, snapshot.as_deref()) {
        (Tab::ActiveSql, Some(m)) => m.active_sql.get(app.selected_row).map(|s| {
            format!(
                "SELECTED SQL {} ({}): {}",
                s.sql_id,
                s.last_user.as_deref().unwrap_or(NOT_AVAILABLE),
                s.sql_text.as_deref().unwrap_or("N/A").replace('\n', " ")
            )
        }),
        (Tab::Sessions, Some(m)) => aggregate::active_sessions(m)
            .get(app.selected_row)
            .map(|s| {
                format!(
                    "SESSION {},{}: {} ({}) on {} via {} since {}, {} block gets",
                    s.sid,
                    s.serial,
                    or_unknown(s.username.as_deref()),
                    s.osuser.as_deref().unwrap_or(NOT_AVAILABLE),
                    s.machine.as_deref().unwrap_or(NOT_AVAILABLE),
                    s.program.as_deref().unwrap_or(NOT_AVAILABLE),
                    s.logon_time.as_deref().unwrap_or(NOT_AVAILABLE),
                    count(s.block_gets),
                )
            }),
        _ => None,
    };

    let footer = Paragraph::new(Line::from(vec![Span::raw(detail.unwrap_or(help))]))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, area);
}

// ---- helpers ----

fn header_row<'a>(cells: &[&'a str]) -> Row<'a> {
    Row::new(cells.iter().map(|h| Cell::from(*h)))
        .style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
        .bottom_margin(1)
}

fn simple_table<'a>(
    title: &str,
    header: &[&'a str],
    rows: Vec<Vec<String>>,
    widths: Vec<Constraint>,
    selected: Option<usize>,
) -> Table<'a> {
    let rows = rows.into_iter().enumerate().map(|(i, items)| {
        let style = if Some(i) == selected {
            Style::default().fg(Color::Black).bg(Color::White)
        } else {
            Style::default()
        };
        Row::new(items.into_iter().map(Cell::from)).style(style)
    });

    Table::new(rows, widths)
        .header(header_row(header))
        .block(Block::default().borders(Borders::ALL).title(title.to_string()))
}

fn draw_bars(f: &mut Frame, area: Rect, title: &str, bars: &[(String, u64)]) {
    let data: Vec<(&str, u64)> = bars.iter().map(|(label, v)| (label.as_str(), *v)).collect();
    let chart = BarChart::default()
        .block(Block::default().borders(Borders::ALL).title(title.to_string()))
        .data(data.as_slice())
        .bar_width(9)
        .bar_gap(1)
        .bar_style(Style::default().fg(Color::Cyan))
        .value_style(Style::default().fg(Color::Black).bg(Color::Cyan));
    f.render_widget(chart, area);
}

fn or_unknown(value: Option<&str>) -> String {
    value.unwrap_or(UNKNOWN_GROUP).to_string()
}

fn secs(value: f64) -> String {
    format!("{value:.2}")
}

/// Unknown readings render as `n/a`, never as zero.
fn opt(value: Option<f64>, precision: usize, suffix: &str) -> String {
    value.map_or_else(
        || NOT_AVAILABLE.to_string(),
        |v| format!("{v:.precision$}{suffix}"),
    )
}

fn opt_count(value: Option<i64>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), count)
}

/// Integer with thousands separators.
fn count(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
