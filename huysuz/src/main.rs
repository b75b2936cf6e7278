//! Huysuz - grumpy-partner chat TUI.
//!
//! A terminal chat with a simulated partner whose irritation rises with
//! every message until the session ends on the block screen.
//!
//! The partner is powered by Gemini; set `GEMINI_API_KEY` (directly or via
//! a `.env` file). Without a key the game still runs and shows the
//! connection notice on the first message.

mod app;
mod events;
mod ui;

use crossterm::{
    event, execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use huysuz_core::ChatSession;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, stdout};
use std::time::Duration;

use app::App;
use events::{handle_event, EventResult};
use ui::render::render;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    // A missing GEMINI_API_KEY is not fatal: the session surfaces a
    // recoverable notice on the first message instead.
    let session = ChatSession::from_env();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run app
    let result = run_app(&mut terminal, App::new(session)).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    if let Err(e) = result {
        eprintln!("Error: {e}");
    }

    Ok(())
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    mut app: App,
) -> io::Result<()> {
    loop {
        // Fire due timers (opening message, block transition) every pass,
        // not just on idle ticks, so they land while the user types.
        app.tick();

        terminal.draw(|f| render(f, &app))?;

        // Resolve an open turn inline. The frame above already shows the
        // user's message and the "yazıyor..." indicator.
        if app.session.reply_pending() {
            // Failures surface through the session's notice, not here.
            let _ = app.session.resolve_turn().await;
            continue;
        }

        // Poll for events with a timeout so timers keep advancing
        if event::poll(Duration::from_millis(100))? {
            let ev = event::read()?;

            match handle_event(&mut app, ev) {
                EventResult::Quit => return Ok(()),
                EventResult::SubmitMessage => {
                    if let Some(input) = app.submit_input() {
                        // The turn opens now and resolves at the top of
                        // the next pass, after a redraw.
                        let _ = app.session.begin_turn(&input);
                    }
                }
                EventResult::NeedsRedraw | EventResult::Continue => {}
            }
        }
    }
}

fn print_help() {
    println!("Huysuz - grumpy-partner chat simulator");
    println!();
    println!("USAGE:");
    println!("  huysuz [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("  -h, --help    Show this help message");
    println!();
    println!("KEYS:");
    println!("  selection     e = Erkek partner, k = Kadın partner, q = quit");
    println!("  chat          type and press Enter to send, Esc = quit");
    println!("  blocked       r = restart, q = quit");
    println!();
    println!("ENVIRONMENT:");
    println!("  GEMINI_API_KEY   Gemini API key (or put it in a .env file).");
    println!("                   Without it the chat shows a connection notice.");
}
