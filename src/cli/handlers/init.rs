use std::error::Error;
use std::fs;
use std::path::Path;

use crate::cli::commands::InitArgs;
use crate::io::rules_io::{CONFIG_DIR, DEFAULT_RULES, RULES_FILE};

/// Lifecycle primer written next to the rules file.
const DEFAULT_DIRECTIVES: &str = "\
# Workspace Directives

## Lifecycle

Every checklist task moves through a fixed lifecycle, carried as a
bracketed tag on its line:

- **[PROTOTYPE]** works in isolation, often against mock data
- **[INTEGRATION_CANDIDATE]** selected for integration, under active development
- **[PRODUCTION]** fully integrated, tested, documented

## Principles

1. Every idea starts as a prototype.
2. Only tested and documented work reaches production; the readiness gate
   enforces this on promotion.
3. Integration debt is measured continuously (`gate debt`), not guessed.
";

/// Create `.gatehouse/` with the default rules and directives. Existing
/// files are kept unless `--force` is given.
pub fn cmd_init(args: InitArgs, root: &Path) -> Result<(), Box<dyn Error>> {
    let config_dir = root.join(CONFIG_DIR);
    fs::create_dir_all(&config_dir)?;

    for (name, content) in [(RULES_FILE, DEFAULT_RULES), ("directives.md", DEFAULT_DIRECTIVES)] {
        let path = config_dir.join(name);
        if path.exists() && !args.force {
            println!("kept existing {}", path.display());
        } else {
            fs::write(&path, content)?;
            println!("wrote {}", path.display());
        }
    }
    Ok(())
}
