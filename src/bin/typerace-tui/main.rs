//! Terminal participant for a typerace server.
//!
//! Usage: `typerace-tui <server-url> [race-id]`. Without a race id a new race
//! is created and owned by this terminal.

#[cfg(feature = "tui")]
mod app;

fn main() -> anyhow::Result<()> {
    #[cfg(feature = "tui")]
    {
        app::run()?;
    }
    Ok(())
}
