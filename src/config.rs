use std::path::Path;

use anyhow::anyhow;
use config::{Config, File};
use serde::Deserialize;

#[derive(Deserialize, Debug, Clone)]
pub struct Settings {
    /// Suffix appended to display names in rewritten links (e.g. "|300")
    pub image_size_suffix: String,
    pub image_desc: ImageDescMode,
    /// Trash local image files after their references have been rewritten
    pub delete_source: bool,
    /// Fence tags whose code blocks are still scanned for image references
    pub allowed_code_fences: Vec<String>,
    pub work_on_network: bool,
    pub network_domain_blacklist: Vec<String>,
    /// External command the CLI uploader invokes with the image paths
    pub upload_command: String,
    pub url_suffix: String,
    /// Vault-relative path of the uploaded-images ledger
    pub ledger_path: String,
}

/// How the display name of a rewritten reference is derived from the
/// original file name.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub enum ImageDescMode {
    Origin,
    None,
    RemoveDefault,
}

impl Settings {
    pub fn new(root_dir: &Path) -> anyhow::Result<Settings> {
        let expanded = shellexpand::tilde("~/.config/picshift/settings");
        let settings = Config::builder()
            .add_source(File::with_name(&expanded).required(false))
            .add_source(
                File::with_name(&format!(
                    "{}/.picshift",
                    root_dir
                        .to_str()
                        .ok_or(anyhow!("Can't convert root_dir to str"))?
                ))
                .required(false),
            )
            .set_default("image_size_suffix", "")?
            .set_default("image_desc", "Origin")?
            .set_default("delete_source", false)?
            .set_default("allowed_code_fences", vec!["ad-quote".to_string()])?
            .set_default("work_on_network", false)?
            .set_default("network_domain_blacklist", Vec::<String>::new())?
            .set_default("upload_command", "")?
            .set_default("url_suffix", "")?
            .set_default("ledger_path", ".picshift-ledger.json")?
            .build()
            .map_err(|err| anyhow!("Build err: {err}"))?;

        let settings = settings.try_deserialize::<Settings>()?;

        anyhow::Ok(settings)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            image_size_suffix: "".to_string(),
            image_desc: ImageDescMode::Origin,
            delete_source: false,
            allowed_code_fences: vec!["ad-quote".to_string()],
            work_on_network: false,
            network_domain_blacklist: vec![],
            upload_command: "".to_string(),
            url_suffix: "".to_string(),
            ledger_path: ".picshift-ledger.json".to_string(),
        }
    }
}
