use crate::cli::actions::{Settings, runtime};
use crate::collector::{Collector, CollectorError, queries::EXAMPLE_QUERIES};
use crate::model::QueryResult;
use crate::monitor::{
    aggregate,
    gateway::{EMPTY_QUERY_MESSAGE, QueryGateway, QueryPanel, Ticket},
    scheduler::RefreshScheduler,
    store::SnapshotStore,
    view::{Tab, ViewState},
};
use anyhow::Result;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::{io, sync::Arc, time::Duration};
use tokio::{runtime::Runtime, sync::mpsc};
use tracing::{debug, info};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

type QueryOutcome = (Ticket, Result<QueryResult, CollectorError>);

pub struct App {
    pub view: ViewState,
    pub store: Arc<SnapshotStore>,
    pub collector_url: String,
    pub panel: QueryPanel,
    /// Keystrokes go to the SQL editor instead of the key bindings.
    pub editing: bool,
    pub selected_row: usize,
    /// Next example query offered by `n`.
    pub next_example: usize,
    pub should_quit: bool,
    scheduler: RefreshScheduler,
    gateway: QueryGateway,
    outcomes_tx: mpsc::UnboundedSender<QueryOutcome>,
    outcomes_rx: mpsc::UnboundedReceiver<QueryOutcome>,
    // dropped last: the scheduler's tasks live on it
    runtime: Runtime,
}

impl App {
    pub fn new(settings: Settings) -> Result<Self> {
        let collector = settings.collector()?;
        Self::with_collector(collector, &settings)
    }

    pub fn with_collector(collector: Arc<dyn Collector>, settings: &Settings) -> Result<Self> {
        let store = Arc::new(SnapshotStore::new());
        let scheduler = RefreshScheduler::new(
            collector.clone(),
            store.clone(),
            settings.intervals,
            settings.sql_limit,
        );
        let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();

        Ok(Self {
            view: ViewState::new(settings.home_view, settings.sql_limit),
            store,
            collector_url: settings.url.to_string(),
            panel: QueryPanel::default(),
            editing: false,
            selected_row: 0,
            next_example: 0,
            should_quit: false,
            scheduler,
            gateway: QueryGateway::new(collector),
            outcomes_tx,
            outcomes_rx,
            runtime: runtime()?,
        })
    }

    pub fn run(&mut self) -> Result<()> {
        {
            let _guard = self.runtime.enter();
            self.scheduler.start();
        }

        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let outcome = self.event_loop(&mut terminal);

        self.runtime.block_on(self.scheduler.stop());
        info!("refresh loops stopped");

        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;

        outcome
    }

    /// Redraws only when a snapshot was published, a query finished or a
    /// key was pressed.
    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        let mut metrics_rx = self.store.subscribe_metrics();
        let mut resources_rx = self.store.subscribe_resources();
        let mut dirty = true;

        while !self.should_quit {
            if metrics_rx.has_changed().unwrap_or(false) {
                metrics_rx.mark_unchanged();
                self.clamp_selection();
                dirty = true;
            }
            if resources_rx.has_changed().unwrap_or(false) {
                resources_rx.mark_unchanged();
                dirty = true;
            }
            dirty |= self.drain_outcomes();

            if dirty {
                terminal.draw(|f| crate::tui::ui::draw(f, self))?;
                dirty = false;
            }

            if let Ok(true) = event::poll(POLL_INTERVAL)
                && let Event::Key(key) = event::read()?
                && key.kind == KeyEventKind::Press
            {
                self.handle_key(key);
                dirty = true;
            }
        }
        Ok(())
    }

    /// Apply finished query outcomes; superseded ones are dropped by the
    /// panel. Returns whether anything arrived.
    pub fn drain_outcomes(&mut self) -> bool {
        let mut received = false;
        while let Ok((ticket, outcome)) = self.outcomes_rx.try_recv() {
            self.panel.finish(ticket, outcome);
            received = true;
        }
        received
    }

    /// Keep the selection inside the current row set after a new snapshot
    /// shrank it.
    fn clamp_selection(&mut self) {
        self.selected_row = self.selected_row.min(self.row_count().saturating_sub(1));
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }
        if self.editing {
            self.handle_editor_key(key);
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char(c @ '1'..='8') => {
                if let Some(tab) = c
                    .to_digit(10)
                    .and_then(|n| usize::try_from(n).ok())
                    .and_then(Tab::from_number)
                {
                    self.set_tab(tab);
                }
            }
            KeyCode::Tab => self.set_tab(self.view.tab.next()),
            KeyCode::Char('r') => {
                debug!("manual metrics refresh");
                self.scheduler.request_metrics();
            }
            KeyCode::Char('+') => self.set_sql_limit(self.view.sql_limit.larger()),
            KeyCode::Char('-') => self.set_sql_limit(self.view.sql_limit.smaller()),
            KeyCode::Down => {
                let len = self.row_count();
                if len > 0 && self.selected_row < len - 1 {
                    self.selected_row += 1;
                }
            }
            KeyCode::Up => {
                self.selected_row = self.selected_row.saturating_sub(1);
            }
            _ if self.view.tab == Tab::SqlQuery => self.handle_query_key(key),
            _ => {}
        }
    }

    fn handle_query_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('e' | 'i') => self.editing = true,
            KeyCode::Enter => self.submit_query(),
            KeyCode::Char('n') => self.load_next_example(),
            KeyCode::Char('c') => {
                self.panel.clear();
                self.selected_row = 0;
            }
            _ => {}
        }
    }

    fn handle_editor_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.editing = false,
            KeyCode::Enter if key.modifiers.contains(KeyModifiers::ALT) => {
                self.panel.input.push('\n');
            }
            KeyCode::Enter => {
                self.editing = false;
                self.submit_query();
            }
            KeyCode::Backspace => {
                self.panel.input.pop();
            }
            KeyCode::Char(c) => self.panel.input.push(c),
            _ => {}
        }
    }

    fn set_tab(&mut self, tab: Tab) {
        self.view.select_tab(tab);
        self.selected_row = 0;
    }

    fn set_sql_limit(&mut self, limit: crate::monitor::view::SqlLimit) {
        if self.view.set_sql_limit(limit) {
            info!(sql_limit = %limit, "active SQL row limit changed");
            self.scheduler.set_sql_limit(limit);
            self.selected_row = 0;
        }
    }

    fn load_next_example(&mut self) {
        if let Some(example) = EXAMPLE_QUERIES.get(self.next_example) {
            self.panel.load(example.sql);
            self.selected_row = 0;
        }
        self.next_example = (self.next_example + 1) % EXAMPLE_QUERIES.len().max(1);
    }

    /// Submit the editor text. The outcome arrives through the outcome
    /// channel and is applied on the next frame.
    fn submit_query(&mut self) {
        if self.panel.input.trim().is_empty() {
            self.panel.fail(EMPTY_QUERY_MESSAGE.to_string());
            return;
        }
        let ticket = self.panel.begin();
        self.selected_row = 0;

        let sql = self.panel.input.clone();
        let gateway = self.gateway.clone();
        let tx = self.outcomes_tx.clone();
        self.runtime.spawn(async move {
            let outcome = gateway.execute(&sql).await;
            // receiver gone means the app is shutting down
            let _ = tx.send((ticket, outcome));
        });
    }

    /// Rows the selection can move over in the current tab.
    fn row_count(&self) -> usize {
        if self.view.tab == Tab::SqlQuery {
            return self.panel.result().map_or(0, |r| r.rows().len());
        }
        let Some(snapshot) = self.store.current_metrics() else {
            return 0;
        };
        match self.view.tab {
            Tab::Sessions => aggregate::active_sessions(&snapshot).len(),
            Tab::ActiveSql => snapshot.active_sql.len(),
            Tab::TableStats => snapshot.table_stats.len(),
            Tab::Performance => snapshot.system_events.len().min(aggregate::SYSTEM_EVENTS_SIZE),
            Tab::Storage => snapshot.tablespaces.len(),
            Tab::Overview | Tab::SqlQuery | Tab::Resources => 0,
        }
    }
}
