pub mod app;
pub mod ui;

use std::{
    error::Error,
    io::{self, Stdout},
    time::Duration,
};

use chrono::Utc;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

use crate::config::Config;
use crate::notify::NoticeBuffer;
use crate::session::Session;
use crate::store::DocumentStore;
use app::{App, InputMode, Tab};
use ui::ui;

/// Redraw interval; keeps the timer ticking and picks up store pushes.
const TICK: Duration = Duration::from_millis(250);

type DashboardTerminal = Terminal<CrosstermBackend<Stdout>>;

pub fn run_tui(store: &dyn DocumentStore, session: &Session, config: &Config) -> Result<(), Box<dyn Error>> {
    let mut terminal = enter_terminal()?;

    let notices = NoticeBuffer::default();
    let mut app = App::new(store, &notices, session, config);
    let res = run_app(&mut terminal, &mut app);

    leave_terminal(&mut terminal)?;
    res.map_err(|err| {
        tracing::error!(error = %err, "Dashboard stopped");
        err.into()
    })
}

fn enter_terminal() -> io::Result<DashboardTerminal> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    let terminal = match execute!(stdout, EnterAlternateScreen, EnableMouseCapture) {
        Ok(()) => Terminal::new(CrosstermBackend::new(stdout)),
        Err(e) => Err(e),
    };
    // Raw mode must not outlive a failed setup.
    if terminal.is_err() {
        let _ = disable_raw_mode();
    }
    terminal
}

fn leave_terminal(terminal: &mut DashboardTerminal) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if !event::poll(TICK)? {
            app.tick();
            continue;
        }
        let Event::Key(key) = event::read()? else { continue };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match app.input_mode {
            InputMode::Normal => match key.code {
                KeyCode::Char('q') => return Ok(()),
                KeyCode::Tab => app.next_tab(),
                KeyCode::BackTab => app.previous_tab(),
                KeyCode::Char(c @ '1'..='6') => {
                    let idx = c as usize - '1' as usize;
                    app.set_tab(Tab::ALL[idx]);
                }
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::Left | KeyCode::Char('h') if app.tab == Tab::Board => app.shift_column(false),
                KeyCode::Right | KeyCode::Char('l') if app.tab == Tab::Board => app.shift_column(true),
                KeyCode::Char('<') => app.move_task(false),
                KeyCode::Char('>') => app.move_task(true),
                KeyCode::Char(' ') => app.toggle_done(),
                KeyCode::Char('d') | KeyCode::Delete => app.delete_selected(),
                KeyCode::Char('a') => app.start_add(),
                KeyCode::Char('e') => app.start_edit(),
                KeyCode::Char('s') if app.tab == Tab::Time => app.toggle_timer(Utc::now()),
                KeyCode::Char('p') if app.tab == Tab::Time => app.cycle_timer_project(),
                KeyCode::Char('r') => app.reload(),
                _ => {}
            },
            InputMode::Dialog => match key.code {
                KeyCode::Enter => app.handle_input(),
                KeyCode::Esc => app.cancel_dialog(),
                KeyCode::Char(c) => app.input_buffer.push(c),
                KeyCode::Backspace => {
                    app.input_buffer.pop();
                }
                _ => {}
            },
        }
    }
}
