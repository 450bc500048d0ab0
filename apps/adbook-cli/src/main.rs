//! adbook - export Global Catalog users into a contact store
//!
//! Binds to an Active Directory Global Catalog, reads every user's display
//! name and mail address, and saves them as contacts in a new timestamped
//! store (an Outlook data file on Windows, or a CSV file).

use clap::Parser;

use adbook_cli::{run, Cli};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let result = run(cli).await;

    match result {
        Ok(_) => std::process::exit(0),
        Err(e) => {
            e.print();
            std::process::exit(e.exit_code());
        }
    }
}
