//! CLI Tooling
//!
//! Command-line interface over a workspace-local tree store. Commands act on
//! behalf of `--as <principal>` (resolved through the role store) or, when no
//! principal is given, as the local administrator.

use crate::access::{GrantSet, GrantSupplier, PermissionLevel, Role, RoleDirectory};
use crate::config::{ArborConfig, ConfigLoader};
use crate::error::{ApiError, StorageError};
use crate::progress::{Completion, NodeRef};
use crate::service::{NewNode, TreeService};
use crate::store::{RoleStore, SledTreeStore};
use crate::tree::{AnnotatedNode, NodeKind};
use crate::types::TreeKind;
use clap::{Parser, Subcommand};
use comfy_table::Table;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Arbor CLI - access control over archive categories and the organigram
#[derive(Parser)]
#[command(name = "arbor")]
#[command(about = "Hierarchical permissions, tree listings and completion for archives and organigrams")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Act as this principal instead of the local administrator
    #[arg(long = "as")]
    pub principal: Option<String>,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    pub format: String,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show a tree as the acting principal sees it
    Tree {
        /// Which tree (category, organigram)
        #[arg(long, default_value = "organigram")]
        tree: TreeKind,
        /// Unfiltered public listing
        #[arg(long)]
        public: bool,
    },
    /// Organigram completion summary
    Progress,
    /// Organigram nodes still missing their file
    Missing,
    /// Node operations
    Node {
        #[command(subcommand)]
        command: NodeCommands,
    },
    /// Role operations
    Role {
        #[command(subcommand)]
        command: RoleCommands,
    },
}

#[derive(Subcommand)]
pub enum NodeCommands {
    /// Create a node
    Add {
        id: String,
        name: String,
        #[arg(long)]
        parent: Option<String>,
        #[arg(long, default_value = "organigram")]
        tree: TreeKind,
        /// leaf, container or group (organigram only)
        #[arg(long, default_value = "container")]
        kind: NodeKind,
    },
    /// Move a node under a new parent (root when omitted)
    Move {
        id: String,
        #[arg(long)]
        parent: Option<String>,
        /// Index among the new siblings; appends when omitted
        #[arg(long)]
        position: Option<usize>,
        #[arg(long, default_value = "organigram")]
        tree: TreeKind,
    },
    /// Rename a node
    Rename {
        id: String,
        name: String,
        #[arg(long, default_value = "organigram")]
        tree: TreeKind,
    },
    /// Change the kind of an organigram node
    Kind { id: String, kind: NodeKind },
    /// Delete a node and its subtree
    Rm {
        id: String,
        #[arg(long, default_value = "organigram")]
        tree: TreeKind,
    },
    /// Attach a file to an organigram node
    Attach { id: String, file: String },
}

#[derive(Subcommand)]
pub enum RoleCommands {
    /// Create a role
    Add {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Grant a role view or crud on a node
    Grant {
        role: String,
        node: String,
        #[arg(long, default_value = "view")]
        level: PermissionLevel,
        #[arg(long, default_value = "organigram")]
        tree: TreeKind,
    },
    /// Remove a role's grant on a node
    Revoke {
        role: String,
        node: String,
        #[arg(long, default_value = "organigram")]
        tree: TreeKind,
    },
    /// Assign roles to a principal, replacing previous assignments
    Assign {
        principal: String,
        roles: Vec<String>,
    },
    /// List roles
    List,
}

/// Name of a command for logging
fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Tree { .. } => "tree",
        Commands::Progress => "progress",
        Commands::Missing => "missing",
        Commands::Node { command } => match command {
            NodeCommands::Add { .. } => "node add",
            NodeCommands::Move { .. } => "node move",
            NodeCommands::Rename { .. } => "node rename",
            NodeCommands::Kind { .. } => "node kind",
            NodeCommands::Rm { .. } => "node rm",
            NodeCommands::Attach { .. } => "node attach",
        },
        Commands::Role { command } => match command {
            RoleCommands::Add { .. } => "role add",
            RoleCommands::Grant { .. } => "role grant",
            RoleCommands::Revoke { .. } => "role revoke",
            RoleCommands::Assign { .. } => "role assign",
            RoleCommands::List => "role list",
        },
    }
}

/// CLI context for executing commands
pub struct CliContext {
    service: TreeService<SledTreeStore>,
    store: Arc<SledTreeStore>,
    directory: RoleDirectory,
    principal: Option<String>,
    json: bool,
}

impl CliContext {
    /// Create a context over the store named by `config`
    pub fn with_config(
        workspace_root: &std::path::Path,
        config: ArborConfig,
        principal: Option<String>,
        format: &str,
    ) -> Result<Self, ApiError> {
        let json = match format {
            "json" => true,
            "text" => false,
            other => {
                return Err(ApiError::ConfigError(format!(
                    "Invalid output format: {} (must be 'text' or 'json')",
                    other
                )))
            }
        };

        let store_path = config.storage.resolve_path(workspace_root)?;
        std::fs::create_dir_all(&store_path)
            .map_err(|e| ApiError::StorageError(StorageError::IoError(e)))?;
        let store = Arc::new(SledTreeStore::open(&store_path)?);

        let service = TreeService::new(store.clone(), config)
            .with_roles(RoleDirectory::new(store.clone()));
        let directory = RoleDirectory::new(store.clone());

        Ok(Self {
            service,
            store,
            directory,
            principal,
            json,
        })
    }

    fn grants(&self, kind: TreeKind) -> Result<GrantSet, ApiError> {
        match &self.principal {
            Some(principal) => self.directory.grants_for(principal, kind),
            None => Ok(GrantSet::admin()),
        }
    }

    /// Execute a CLI command
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        let result = self.execute_inner(command);
        if result.is_ok() {
            self.store.flush()?;
        }
        info!(
            command = command_name(command),
            principal = self.principal.as_deref().unwrap_or("admin"),
            ok = result.is_ok(),
            "Command finished"
        );
        result
    }

    fn execute_inner(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Tree { tree, public } => {
                let nodes = if *public {
                    self.service.public_tree(*tree)?
                } else {
                    self.service.tree(*tree, &self.grants(*tree)?)?
                };
                if self.json {
                    return to_json(&nodes);
                }
                Ok(format_tree_table(&nodes))
            }
            Commands::Progress => {
                let completion = self
                    .service
                    .progress(&self.grants(TreeKind::Organigram)?)?;
                if self.json {
                    return to_json(&completion);
                }
                Ok(format_completion(&completion))
            }
            Commands::Missing => {
                let missing = self.service.missing(&self.grants(TreeKind::Organigram)?)?;
                if self.json {
                    return to_json(&missing);
                }
                Ok(format_missing_table(&missing))
            }
            Commands::Node { command } => self.execute_node(command),
            Commands::Role { command } => self.execute_role(command),
        }
    }

    fn execute_node(&self, command: &NodeCommands) -> Result<String, ApiError> {
        let node = match command {
            NodeCommands::Add {
                id,
                name,
                parent,
                tree,
                kind,
            } => {
                let mut request =
                    NewNode::new(id.clone(), parent.clone(), name.clone()).with_kind(*kind);
                if let Some(principal) = &self.principal {
                    request = request.created_by(principal.clone());
                }
                self.service
                    .create_node(*tree, &self.grants(*tree)?, request)?
            }
            NodeCommands::Move {
                id,
                parent,
                position,
                tree,
            } => self.service.move_node(
                *tree,
                &self.grants(*tree)?,
                id,
                parent.as_deref(),
                *position,
            )?,
            NodeCommands::Rename { id, name, tree } => self.service.rename_node(
                *tree,
                &self.grants(*tree)?,
                id,
                name,
                self.principal.as_deref(),
            )?,
            NodeCommands::Kind { id, kind } => self.service.set_kind(
                &self.grants(TreeKind::Organigram)?,
                id,
                *kind,
                self.principal.as_deref(),
            )?,
            NodeCommands::Rm { id, tree } => {
                let removed = self.service.delete_node(*tree, &self.grants(*tree)?, id)?;
                if self.json {
                    return to_json(&serde_json::json!({ "deleted": id, "removed": removed }));
                }
                return Ok(format!("Deleted {} ({} node(s))", id, removed));
            }
            NodeCommands::Attach { id, file } => self.service.attach_file(
                &self.grants(TreeKind::Organigram)?,
                id,
                file,
                self.principal.as_deref().unwrap_or("admin"),
            )?,
        };
        if self.json {
            return to_json(&node);
        }
        let mut out = format!("{} {} ({:?})", node.id, node.name, node.kind);
        if let Some(parent) = &node.parent {
            out.push_str(&format!(" under {}", parent));
        }
        if let Some(reference) = node.versions.last().map(|v| &v.reference).or(node.reference.as_ref()) {
            out.push_str(&format!(" [{}]", reference));
        }
        Ok(out)
    }

    fn execute_role(&self, command: &RoleCommands) -> Result<String, ApiError> {
        match command {
            RoleCommands::Add { name, description } => {
                if self.store.get_role(name)?.is_some() {
                    return Err(ApiError::InvalidNode(format!("Role {} already exists", name)));
                }
                let mut role = Role::new(name.clone());
                role.description = description.clone();
                self.store.put_role(&role)?;
                Ok(format!("Created role {}", name))
            }
            RoleCommands::Grant {
                role,
                node,
                level,
                tree,
            } => {
                let mut record = self.load_role(role)?;
                record.grant(*tree, node.clone(), *level);
                self.store.put_role(&record)?;
                Ok(format!("Granted {} on {} {} to {}", level, tree, node, role))
            }
            RoleCommands::Revoke { role, node, tree } => {
                let mut record = self.load_role(role)?;
                if !record.revoke(*tree, node) {
                    return Ok(format!("{} holds no grant on {} {}", role, tree, node));
                }
                self.store.put_role(&record)?;
                Ok(format!("Revoked {} on {} {}", role, tree, node))
            }
            RoleCommands::Assign { principal, roles } => {
                for name in roles {
                    self.load_role(name)?;
                }
                self.store.assign(&crate::access::role::Assignment {
                    principal: principal.clone(),
                    roles: roles.clone(),
                })?;
                Ok(format!("Assigned [{}] to {}", roles.join(", "), principal))
            }
            RoleCommands::List => {
                let roles = self.store.list_roles()?;
                if self.json {
                    return to_json(&roles);
                }
                Ok(format_roles_table(&roles))
            }
        }
    }

    fn load_role(&self, name: &str) -> Result<Role, ApiError> {
        self.store
            .get_role(name)?
            .ok_or_else(|| ApiError::NotFound(format!("role {}", name)))
    }
}

/// Load configuration from `config_path`, or from the layered sources of the workspace
pub fn load_config(
    workspace_root: &std::path::Path,
    config_path: Option<&PathBuf>,
) -> Result<ArborConfig, ApiError> {
    let config = match config_path {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load(workspace_root)?,
    };
    Ok(config)
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ApiError::StorageError(StorageError::Serialization(e.to_string())))
}

/// Format an assembled forest as an indented table
pub fn format_tree_table(nodes: &[AnnotatedNode]) -> String {
    if nodes.is_empty() {
        return "No nodes visible.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Node", "Id", "Kind", "Permission", "File"]);

    let mut stack: Vec<(&AnnotatedNode, usize)> = nodes.iter().rev().map(|n| (n, 0)).collect();
    while let Some((node, depth)) = stack.pop() {
        let permission = serde_json::to_value(node.permissions)
            .ok()
            .and_then(|v| v.as_str().map(|s| s.to_string()))
            .unwrap_or_default();
        table.add_row(vec![
            format!("{}{}", "  ".repeat(depth), node.name),
            node.id.clone(),
            format!("{:?}", node.kind),
            permission,
            node.file.clone().unwrap_or_else(|| "-".to_string()),
        ]);
        stack.extend(node.children.iter().rev().map(|c| (c, depth + 1)));
    }
    table.to_string()
}

/// One-line completion summary followed by the missing nodes
pub fn format_completion(completion: &Completion) -> String {
    let mut out = format!(
        "Completion: {}/{} ({}%)",
        completion.completed_count, completion.total, completion.percent
    );
    if !completion.missing.is_empty() {
        out.push('\n');
        out.push_str(&format_missing_table(&completion.missing));
    }
    out
}

/// Format missing nodes as a table
pub fn format_missing_table(missing: &[NodeRef]) -> String {
    if missing.is_empty() {
        return "Nothing missing.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Id", "Name", "Path"]);
    for node in missing {
        table.add_row(vec![
            node.id.clone(),
            node.name.clone(),
            node.path.join(" / "),
        ]);
    }
    table.to_string()
}

fn format_roles_table(roles: &[Role]) -> String {
    if roles.is_empty() {
        return "No roles.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Role", "Description", "Category grants", "Organigram grants"]);
    let describe = |role: &Role, kind: TreeKind| {
        role.grants(kind)
            .iter()
            .map(|g| format!("{}:{}", g.node, g.level))
            .collect::<Vec<_>>()
            .join(", ")
    };
    for role in roles {
        table.add_row(vec![
            role.name.clone(),
            role.description.clone().unwrap_or_default(),
            describe(role, TreeKind::Category),
            describe(role, TreeKind::Organigram),
        ]);
    }
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn context(dir: &TempDir, principal: Option<&str>, format: &str) -> CliContext {
        let mut config = ArborConfig::default();
        config.storage.path = Some(dir.path().join("db"));
        CliContext::with_config(dir.path(), config, principal.map(|p| p.to_string()), format)
            .unwrap()
    }

    fn add(ctx: &CliContext, id: &str, parent: Option<&str>, kind: NodeKind) {
        ctx.execute(&Commands::Node {
            command: NodeCommands::Add {
                id: id.to_string(),
                name: id.to_uppercase(),
                parent: parent.map(|p| p.to_string()),
                tree: TreeKind::Organigram,
                kind,
            },
        })
        .unwrap();
    }

    #[test]
    fn test_cli_parses_global_flags() {
        let cli = Cli::try_parse_from([
            "arbor", "--as", "alice", "--format", "json", "node", "move", "n1", "--parent", "n2",
            "--position", "0",
        ])
        .unwrap();
        assert_eq!(cli.principal.as_deref(), Some("alice"));
        assert_eq!(cli.format, "json");
        match cli.command {
            Commands::Node {
                command:
                    NodeCommands::Move {
                        id,
                        parent,
                        position,
                        tree,
                    },
            } => {
                assert_eq!(id, "n1");
                assert_eq!(parent.as_deref(), Some("n2"));
                assert_eq!(position, Some(0));
                assert_eq!(tree, TreeKind::Organigram);
            }
            _ => panic!("expected node move"),
        }
    }

    #[test]
    fn test_invalid_format_rejected() {
        let dir = TempDir::new().unwrap();
        let mut config = ArborConfig::default();
        config.storage.path = Some(dir.path().join("db"));
        let result = CliContext::with_config(dir.path(), config, None, "yaml");
        assert!(matches!(result, Err(ApiError::ConfigError(_))));
    }

    #[test]
    fn test_admin_builds_tree_and_principal_sees_grants() {
        let dir = TempDir::new().unwrap();
        {
            let admin = context(&dir, None, "text");
            add(&admin, "board", None, NodeKind::ContainerOnly);
            add(&admin, "sales", Some("board"), NodeKind::ContainerWithFile);
            add(&admin, "north", Some("sales"), NodeKind::LeafWithFile);
            add(&admin, "ops", Some("board"), NodeKind::ContainerWithFile);

            admin
                .execute(&Commands::Role {
                    command: RoleCommands::Add {
                        name: "sellers".to_string(),
                        description: None,
                    },
                })
                .unwrap();
            admin
                .execute(&Commands::Role {
                    command: RoleCommands::Grant {
                        role: "sellers".to_string(),
                        node: "north".to_string(),
                        level: PermissionLevel::Crud,
                        tree: TreeKind::Organigram,
                    },
                })
                .unwrap();
            admin
                .execute(&Commands::Role {
                    command: RoleCommands::Assign {
                        principal: "alice".to_string(),
                        roles: vec!["sellers".to_string()],
                    },
                })
                .unwrap();
        }

        let alice = context(&dir, Some("alice"), "json");
        let out = alice
            .execute(&Commands::Tree {
                tree: TreeKind::Organigram,
                public: false,
            })
            .unwrap();
        let nodes: Vec<AnnotatedNode> = serde_json::from_str(&out).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].ids(), vec!["board", "sales", "north"]);

        let out = alice.execute(&Commands::Progress).unwrap();
        let completion: Completion = serde_json::from_str(&out).unwrap();
        assert_eq!(completion.total, 1);
        assert_eq!(completion.percent, 0);

        alice
            .execute(&Commands::Node {
                command: NodeCommands::Attach {
                    id: "north".to_string(),
                    file: "north.pdf".to_string(),
                },
            })
            .unwrap();
        let out = alice.execute(&Commands::Progress).unwrap();
        let completion: Completion = serde_json::from_str(&out).unwrap();
        assert_eq!(completion.percent, 100);

        let err = alice
            .execute(&Commands::Node {
                command: NodeCommands::Rm {
                    id: "ops".to_string(),
                    tree: TreeKind::Organigram,
                },
            })
            .unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[test]
    fn test_text_tree_output_indents_children() {
        let dir = TempDir::new().unwrap();
        let admin = context(&dir, None, "text");
        add(&admin, "board", None, NodeKind::ContainerOnly);
        add(&admin, "sales", Some("board"), NodeKind::ContainerWithFile);

        let out = admin
            .execute(&Commands::Tree {
                tree: TreeKind::Organigram,
                public: false,
            })
            .unwrap();
        assert!(out.contains("BOARD"));
        assert!(out.contains("SALES"));
        assert!(out.contains("crud"));
    }

    #[test]
    fn test_unknown_role_assignment_rejected() {
        let dir = TempDir::new().unwrap();
        let admin = context(&dir, None, "text");
        let err = admin
            .execute(&Commands::Role {
                command: RoleCommands::Assign {
                    principal: "bob".to_string(),
                    roles: vec!["ghosts".to_string()],
                },
            })
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
