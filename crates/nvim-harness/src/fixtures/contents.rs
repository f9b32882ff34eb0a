//! Static contents of the file fixtures.

/// Text shown once the editor has rendered the initial file.
pub const READY_SENTINEL: &str = "If you see this text, Neovim is ready!";

pub(super) const INITIAL_FILE: &str = "If you see this text, Neovim is ready!\n";

pub(super) const TEST_LUA: &str = r#"-- a lua file the tests can open and edit
local M = {}

function M.greet(name)
  return "hello " .. name
end

return M
"#;

pub(super) const FILE_TXT: &str = "Hello\n";

pub(super) const SUB_TXT: &str = "This is a file in a subdirectory\n";

pub(super) const ROUTE_TSX: &str = r#"export default function PostRoute() {
  return <div>post</div>
}
"#;

pub(super) const ADJACENT_FILE_TSX: &str = r#"// a file next to route.tsx, used to check directory navigation
export const adjacent = true
"#;
