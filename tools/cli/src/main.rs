//! keyward CLI - command line interface for the password vault.
//!
//! Every command that touches vault items logs in first; the master
//! secret is read once per invocation and only lives in the session.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use zeroize::Zeroizing;

use keyward_common::{RecordId, SensitiveString};
use keyward_crypto::{
    generate_password, CharsetConfig, KdfParams, KeyScheme, DEFAULT_PASSWORD_LENGTH,
};
use keyward_storage::{create_default_registry, VaultStore};
use keyward_vault::{VaultConfig, VaultItem, VaultManager, VaultSession};

#[derive(Parser)]
#[command(name = "keyward")]
#[command(about = "keyward - Encrypted password vault")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Vault store file (default: <data dir>/keyward/vault.json).
    #[arg(short, long, global = true)]
    store: Option<PathBuf>,

    /// JSON configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new account.
    Signup {
        /// Account email.
        #[arg(short, long)]
        email: String,
    },

    /// List items.
    List {
        /// Account email.
        #[arg(short, long)]
        email: String,

        /// Only show items whose title, username, url or notes contain this.
        #[arg(short = 'q', long)]
        search: Option<String>,
    },

    /// Show one item including its password.
    Show {
        /// Account email.
        #[arg(short, long)]
        email: String,

        /// Item id.
        #[arg(short, long)]
        id: String,
    },

    /// Add an item. The item password is prompted for unless generated.
    Add {
        /// Account email.
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        username: String,

        #[arg(long)]
        url: Option<String>,

        #[arg(long)]
        notes: Option<String>,

        /// Generate the item password instead of prompting for it.
        #[arg(short, long)]
        generate: bool,

        #[command(flatten)]
        generator: GeneratorArgs,
    },

    /// Edit an item. Unset fields keep their value.
    Edit {
        /// Account email.
        #[arg(short, long)]
        email: String,

        /// Item id.
        #[arg(short, long)]
        id: String,

        #[arg(short, long)]
        title: Option<String>,

        #[arg(short, long)]
        username: Option<String>,

        #[arg(long)]
        url: Option<String>,

        #[arg(long)]
        notes: Option<String>,

        /// Prompt for a new item password.
        #[arg(long)]
        password: bool,
    },

    /// Remove an item.
    Remove {
        /// Account email.
        #[arg(short, long)]
        email: String,

        /// Item id.
        #[arg(short, long)]
        id: String,
    },

    /// Print a random password.
    Generate {
        #[command(flatten)]
        generator: GeneratorArgs,
    },

    /// Write the default configuration to a file.
    InitConfig {
        /// Destination file.
        path: PathBuf,

        /// Argon2id cost for login hashes (and keys with --argon2id).
        #[arg(long, value_enum, default_value_t = KdfStrength::Interactive)]
        kdf_strength: KdfStrength,

        /// Derive encryption keys with salted Argon2id for new users.
        #[arg(long)]
        argon2id: bool,
    },
}

/// Argon2id cost presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum KdfStrength {
    Interactive,
    Moderate,
    Sensitive,
}

impl KdfStrength {
    fn params(self) -> KdfParams {
        match self {
            KdfStrength::Interactive => KdfParams::interactive(),
            KdfStrength::Moderate => KdfParams::moderate(),
            KdfStrength::Sensitive => KdfParams::sensitive(),
        }
    }
}

/// Password generator options.
#[derive(Debug, Args)]
struct GeneratorArgs {
    /// Password length.
    #[arg(long, default_value_t = DEFAULT_PASSWORD_LENGTH)]
    length: usize,

    /// Leave out lowercase letters.
    #[arg(long)]
    no_lowercase: bool,

    /// Leave out uppercase letters.
    #[arg(long)]
    no_uppercase: bool,

    /// Leave out digits.
    #[arg(long)]
    no_digits: bool,

    /// Leave out symbols.
    #[arg(long)]
    no_symbols: bool,
}

impl GeneratorArgs {
    fn charset(&self) -> CharsetConfig {
        CharsetConfig {
            lowercase: !self.no_lowercase,
            uppercase: !self.no_uppercase,
            digits: !self.no_digits,
            symbols: !self.no_symbols,
        }
    }

    fn generate(&self) -> Result<SensitiveString> {
        generate_password(self.length, &self.charset()).context("Failed to generate password")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match &cli.command {
        Commands::InitConfig {
            path,
            kdf_strength,
            argon2id,
        } => return cmd_init_config(path, *kdf_strength, *argon2id).await,
        Commands::Generate { generator } => {
            let password = generator.generate()?;
            println!("{}", password.expose());
            return Ok(());
        }
        _ => {}
    }

    let manager = open_manager(cli.store.as_deref(), cli.config.as_deref()).await?;

    match cli.command {
        Commands::Signup { email } => cmd_signup(&manager, &email).await,

        Commands::List { email, search } => cmd_list(&manager, &email, search.as_deref()).await,

        Commands::Show { email, id } => cmd_show(&manager, &email, &id).await,

        Commands::Add {
            email,
            title,
            username,
            url,
            notes,
            generate,
            generator,
        } => {
            let mut item = VaultItem::new(title, username, String::new());
            item.url = url;
            if let Some(notes) = notes {
                item.notes = notes.into();
            }
            let generated = if generate {
                Some(generator.generate()?)
            } else {
                None
            };
            cmd_add(&manager, &email, item, generated).await
        }

        Commands::Edit {
            email,
            id,
            title,
            username,
            url,
            notes,
            password,
        } => {
            let edit = Edit {
                title,
                username,
                url,
                notes,
                password,
            };
            cmd_edit(&manager, &email, &id, edit).await
        }

        Commands::Remove { email, id } => cmd_remove(&manager, &email, &id).await,

        Commands::InitConfig { .. } | Commands::Generate { .. } => Ok(()),
    }
}

/// Build the manager from the store file and optional config file.
async fn open_manager(store: Option<&Path>, config: Option<&Path>) -> Result<VaultManager> {
    let path = match store {
        Some(path) => path.to_path_buf(),
        None => default_store_path()?,
    };

    let config = match config {
        Some(path) => VaultConfig::load(path)
            .await
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => VaultConfig::default(),
    };

    let store: Arc<dyn VaultStore> = create_default_registry()
        .resolve(
            "local",
            serde_json::json!({ "path": path.to_string_lossy() }),
        )
        .with_context(|| format!("Failed to open store {}", path.display()))?;

    VaultManager::new(store, config).context("Invalid configuration")
}

fn default_store_path() -> Result<PathBuf> {
    let base = dirs::data_dir().context("Could not determine data directory; pass --store")?;
    Ok(base.join("keyward").join("vault.json"))
}

/// Prompt for a secret without echo.
fn prompt_secret(prompt: &str) -> Result<Zeroizing<Vec<u8>>> {
    let secret = rpassword::prompt_password(prompt).context("Failed to read password")?;
    Ok(Zeroizing::new(secret.into_bytes()))
}

async fn login(manager: &VaultManager, email: &str) -> Result<VaultSession> {
    let secret = prompt_secret("Master password: ")?;
    manager
        .login(email, &secret)
        .await
        .context("Login failed")
}

fn parse_id(id: &str) -> Result<RecordId> {
    RecordId::new(id).context("Invalid item id")
}

/// Register a new account.
async fn cmd_signup(manager: &VaultManager, email: &str) -> Result<()> {
    let secret = prompt_secret("Master password: ")?;
    let confirm = prompt_secret("Confirm master password: ")?;

    if secret != confirm {
        anyhow::bail!("Passwords do not match");
    }

    if secret.is_empty() {
        anyhow::bail!("Password cannot be empty");
    }

    let user_id = manager
        .signup(email, &secret)
        .await
        .context("Signup failed")?;

    println!("Account created: {}", user_id);
    Ok(())
}

/// List items, showing unreadable ones as placeholders.
async fn cmd_list(manager: &VaultManager, email: &str, search: Option<&str>) -> Result<()> {
    let session = login(manager, email).await?;
    let loaded = manager.list(&session).await.context("Failed to load vault")?;

    if loaded.is_empty() {
        println!("Vault is empty.");
        return Ok(());
    }

    let query = search.unwrap_or("");
    let mut shown = 0;
    for entry in &loaded {
        let id = entry
            .record_id
            .as_ref()
            .map(|id| id.to_string())
            .unwrap_or_default();

        match &entry.result {
            Ok(item) if item.matches(query) => {
                shown += 1;
                println!(
                    "  {}  {}  {}  {}",
                    id,
                    item.title,
                    item.username,
                    item.url.as_deref().unwrap_or("-")
                );
            }
            Ok(_) => {}
            Err(e) => {
                shown += 1;
                println!("  {}  [unreadable: {}]", id, e);
            }
        }
    }

    if shown == 0 {
        println!("No items match '{}'.", query);
    }
    Ok(())
}

/// Show one item.
async fn cmd_show(manager: &VaultManager, email: &str, id: &str) -> Result<()> {
    let id = parse_id(id)?;
    let session = login(manager, email).await?;
    let item = manager
        .get(&session, &id)
        .await
        .context("Failed to read item")?;

    println!("Title:    {}", item.title);
    println!("Username: {}", item.username);
    println!("URL:      {}", item.url.as_deref().unwrap_or("-"));
    println!("Password: {}", item.password.expose());
    if !item.notes.is_empty() {
        println!("Notes:    {}", item.notes.expose());
    }
    Ok(())
}

/// Add an item, with a generated password if one is given.
async fn cmd_add(
    manager: &VaultManager,
    email: &str,
    mut item: VaultItem,
    generated: Option<SensitiveString>,
) -> Result<()> {
    let session = login(manager, email).await?;

    let show_password = generated.is_some();
    item.password = match generated {
        Some(password) => password,
        None => {
            let password = prompt_secret("Item password: ")?;
            String::from_utf8(password.to_vec())
                .context("Item password is not valid UTF-8")?
                .into()
        }
    };

    let id = manager
        .save(&session, &item)
        .await
        .context("Failed to save item")?;

    info!("Item added");
    println!("Item added: {}", id);
    if show_password {
        println!("Password: {}", item.password.expose());
    }
    Ok(())
}

/// Field changes requested by `edit`.
struct Edit {
    title: Option<String>,
    username: Option<String>,
    url: Option<String>,
    notes: Option<String>,
    password: bool,
}

/// Edit an item.
async fn cmd_edit(manager: &VaultManager, email: &str, id: &str, edit: Edit) -> Result<()> {
    let id = parse_id(id)?;
    let session = login(manager, email).await?;
    let mut item = manager
        .get(&session, &id)
        .await
        .context("Failed to read item")?;

    if let Some(title) = edit.title {
        item.title = title;
    }
    if let Some(username) = edit.username {
        item.username = username;
    }
    if let Some(url) = edit.url {
        item.url = if url.is_empty() { None } else { Some(url) };
    }
    if let Some(notes) = edit.notes {
        item.notes = notes.into();
    }
    if edit.password {
        let password = prompt_secret("New item password: ")?;
        item.password = String::from_utf8(password.to_vec())
            .context("Item password is not valid UTF-8")?
            .into();
    }

    manager
        .save(&session, &item)
        .await
        .context("Failed to save item")?;

    println!("Item updated: {}", id);
    Ok(())
}

/// Remove an item.
async fn cmd_remove(manager: &VaultManager, email: &str, id: &str) -> Result<()> {
    let id = parse_id(id)?;
    let session = login(manager, email).await?;

    manager
        .delete(&session, &id)
        .await
        .context("Failed to remove item")?;

    println!("Item removed: {}", id);
    Ok(())
}

/// Configuration for the chosen cost preset and key scheme.
fn init_config(strength: KdfStrength, argon2id: bool) -> VaultConfig {
    let mut config = VaultConfig {
        credential_params: strength.params(),
        ..VaultConfig::default()
    };
    if argon2id {
        config.key_scheme = KeyScheme::Argon2id {
            params: strength.params(),
        };
    }
    config
}

/// Write a configuration file.
async fn cmd_init_config(path: &Path, strength: KdfStrength, argon2id: bool) -> Result<()> {
    init_config(strength, argon2id)
        .save(path)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Configuration written to {}", path.display());
    Ok(())
}
