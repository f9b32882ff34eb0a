//! Startup configuration written into every provisioned directory.

use crate::error::{HarnessError, HarnessResult};
use crate::model::StartupScriptModification;

/// `init.lua` loaded by the editor through `XDG_CONFIG_HOME`.
///
/// Plugins are loaded with `pcall` so the file also works when a plugin is not
/// installed on the host.
pub const STARTUP_SCRIPT: &str = r#"-- startup configuration for a harness-provisioned test directory
vim.opt.swapfile = false
vim.opt.shortmess:append("I")
vim.opt.termguicolors = true
vim.g.mapleader = " "

local ok_yazi, yazi = pcall(require, "yazi")
if ok_yazi then
  yazi.setup({
    open_for_directories = true,
    use_ya_for_events_reading = false,
    keymaps = {
      show_help = "<f1>",
      replace_in_directory = "<c-g>",
    },
  })
  vim.keymap.set("n", "<up>", function()
    yazi.yazi()
  end)
end

local ok_grug, grug = pcall(require, "grug-far")
if ok_grug then
  grug.setup({ headerMaxWidth = 80 })
end
"#;

const EVENT_READER_DEFAULT: &str = "use_ya_for_events_reading = false";
const EVENT_READER_YA: &str = "use_ya_for_events_reading = true";

/// Apply one modification to the startup script.
///
/// Fails when the line the modification rewrites is missing, so a template
/// change can never turn a modification into a silent no-op.
pub(crate) fn rewrite(
    script: &str,
    modification: StartupScriptModification,
) -> HarnessResult<String> {
    let (anchor, replacement) = match modification {
        StartupScriptModification::UseYaAsEventReader => (EVENT_READER_DEFAULT, EVENT_READER_YA),
    };
    if !script.contains(anchor) {
        return Err(HarnessError::new(
            crate::error::ErrorKind::ProvisionFailed,
            format!("startup script has no '{anchor}' line to rewrite"),
            serde_json::json!({ "modification": modification.as_str() }),
        ));
    }
    Ok(script.replacen(anchor, replacement, 1))
}
