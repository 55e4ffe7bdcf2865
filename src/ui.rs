//! Terminal presentation layer.
//!
//! Renders [`SearchState`] snapshots and runs the interactive prompt loop.
//! All decisions about results live in the controller; this module only reads state.

use crate::agent::BusinessFinder;
use crate::business::Business;
use crate::session::{Phase, SearchController, SearchError, SearchState};
use colored::Colorize;
use dialoguer::{Confirm, Input};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Print a status line whenever the controller enters a pending phase
pub fn spawn_status_printer(mut rx: watch::Receiver<SearchState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last = rx.borrow_and_update().phase();
        while rx.changed().await.is_ok() {
            let phase = rx.borrow_and_update().phase();
            if phase == last {
                continue;
            }
            match phase {
                Phase::Searching => eprintln!("{}", "🔎 Searching for businesses...".dimmed()),
                Phase::LoadingMore => eprintln!("{}", "⏳ Loading more businesses...".dimmed()),
                _ => {}
            }
            last = phase;
        }
    })
}

/// Run a search and then up to `pages - 1` load-more calls while more may exist
pub async fn search_pages<F: BusinessFinder>(
    controller: &SearchController<F>,
    pincode: &str,
    area: &str,
    pages: usize,
) {
    // Failures are recorded in the state and rendered from there
    if controller.search(pincode, area).await.is_err() {
        return;
    }
    for _ in 1..pages {
        if !controller.snapshot().has_more {
            break;
        }
        if controller.load_more().await.is_err() {
            break;
        }
    }
}

/// Render the whole state: businesses from `from` onwards, then sources
pub fn render(state: &SearchState, from: usize) {
    match state.phase() {
        Phase::Errored => {
            if let Some(error) = &state.error {
                println!("{} {}", "✖".red().bold(), error.red().bold());
            }
            return;
        }
        Phase::ResultsEmpty => {
            println!(
                "No businesses found for pincode {}.",
                state.pincode.bold()
            );
            return;
        }
        Phase::Idle | Phase::Searching | Phase::LoadingMore => return,
        Phase::ResultsPresent => {}
    }

    if from == 0 {
        println!(
            "=== Businesses in {} ===\n",
            location_label(&state.pincode, &state.area).bold()
        );
    }
    for (index, business) in state.businesses.iter().enumerate().skip(from) {
        render_business(index + 1, business);
    }

    if let Some(error) = &state.error {
        println!("{} {}\n", "⚠".yellow(), error.yellow());
    }

    if !state.sources.is_empty() {
        println!("🔗 Sources:");
        for source in &state.sources {
            println!("  • {} {}", source.title, format!("({})", source.uri).dimmed());
        }
        println!();
    }

    let summary = format!("Showing {} businesses", state.businesses.len());
    if state.has_more {
        println!("{} {}", summary, "(more may be available)".dimmed());
    } else {
        println!("{}", summary);
    }
}

fn render_business(number: usize, business: &Business) {
    match &business.category {
        Some(category) => println!(
            "{:>3}. {} {}",
            number,
            business.name.bold(),
            format!("[{}]", category).cyan()
        ),
        None => println!("{:>3}. {}", number, business.name.bold()),
    }
    if !business.address.is_empty() {
        println!("     📍 {}", business.address);
    }
    if let Some(phone) = &business.phone {
        println!("     📞 {}", phone);
    }
    println!();
}

/// Whether the interactive loop may offer "load more" after a search
fn offers_more(outcome: &Result<(), SearchError>, state: &SearchState) -> bool {
    !matches!(outcome, Err(SearchError::Validation | SearchError::Busy))
        && state.phase() == Phase::ResultsPresent
        && state.has_more
}

fn location_label(pincode: &str, area: &str) -> String {
    if area.trim().is_empty() {
        pincode.to_string()
    } else {
        format!("{}, {}", area.trim(), pincode)
    }
}

/// Interactive loop: ask for a pincode and area, show results, offer more.
///
/// An empty pincode quits.
pub async fn run<F: BusinessFinder>(controller: SearchController<F>) -> anyhow::Result<()> {
    let status = spawn_status_printer(controller.subscribe());

    loop {
        let pincode: String = Input::new()
            .with_prompt("Pincode (empty to quit)")
            .allow_empty(true)
            .interact_text()?;
        let pincode = pincode.trim().to_string();
        if pincode.is_empty() {
            break;
        }

        let area: String = Input::new()
            .with_prompt("Area (optional)")
            .allow_empty(true)
            .interact_text()?;

        let outcome = controller.search(&pincode, area.trim()).await;
        if let Err(SearchError::Validation) = outcome {
            // State still holds the previous pincode's results
            println!("{} {}", "✖".red().bold(), SearchError::Validation.to_string().red().bold());
            continue;
        }

        // Request failures are in the state
        let state = controller.snapshot();
        render(&state, 0);
        if !offers_more(&outcome, &state) {
            continue;
        }
        let mut shown = state.businesses.len();

        while controller.snapshot().has_more {
            let more = Confirm::new()
                .with_prompt("Load more businesses?")
                .default(true)
                .interact()?;
            if !more {
                break;
            }
            let _ = controller.load_more().await;
            let state = controller.snapshot();
            render(&state, shown);
            shown = state.businesses.len();
        }
        println!();
    }

    status.abort();
    Ok(())
}
