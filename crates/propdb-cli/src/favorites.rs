use clap::Subcommand;
use propdb_client::FavoritesStore;

/// Sub-commands available under `favorites`.
#[derive(Debug, Subcommand)]
pub enum FavoritesCommands {
    /// List favorite listing ids
    List,
    /// Mark a listing as favorite
    Add { id: String },
    /// Unmark a listing
    Remove { id: String },
    /// Flip a listing's favorite state
    Toggle { id: String },
}

/// # Errors
///
/// Returns an error if the favorites store cannot be read or written.
pub(crate) async fn run_favorites(
    store: &dyn FavoritesStore,
    command: FavoritesCommands,
) -> anyhow::Result<()> {
    match command {
        FavoritesCommands::List => {
            let mut ids: Vec<String> = store.list().await?.into_iter().collect();
            if ids.is_empty() {
                println!("no favorites yet");
                return Ok(());
            }
            ids.sort();
            for id in ids {
                println!("{id}");
            }
        }
        FavoritesCommands::Add { id } => {
            store.add(&id).await?;
            println!("{id}: favorited");
        }
        FavoritesCommands::Remove { id } => {
            store.remove(&id).await?;
            println!("{id}: not favorited");
        }
        FavoritesCommands::Toggle { id } => {
            let now = if store.toggle(&id).await? {
                "favorited"
            } else {
                "not favorited"
            };
            println!("{id}: {now}");
        }
    }
    Ok(())
}
