//! Wiring declared dependencies into CMakeLists.txt.
//!
//! relay owns the lines between two marker pairs and nothing else:
//!
//! ```cmake
//! # relay:find-begin
//!   find_package(ZLIB REQUIRED)
//! # relay:find-end
//! # relay:link-begin
//!   target_link_libraries(demo PRIVATE ZLIB::ZLIB)
//! # relay:link-end
//! ```

use std::path::Path;

use anyhow::Result;

use crate::core::ProjectManifest;
use crate::util::fs;

pub const CMAKELISTS_FILE: &str = "CMakeLists.txt";

pub const FIND_BEGIN: &str = "# relay:find-begin";
pub const FIND_END: &str = "# relay:find-end";
pub const LINK_BEGIN: &str = "# relay:link-begin";
pub const LINK_END: &str = "# relay:link-end";

/// How a port is consumed from CMake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CMakeMapping {
    pub port: &'static str,
    pub find_package: &'static str,
    pub target: &'static str,
}

const MAPPINGS: &[CMakeMapping] = &[
    CMakeMapping { port: "zlib", find_package: "find_package(ZLIB REQUIRED)", target: "ZLIB::ZLIB" },
    CMakeMapping { port: "fmt", find_package: "find_package(fmt CONFIG REQUIRED)", target: "fmt::fmt" },
    CMakeMapping { port: "spdlog", find_package: "find_package(spdlog CONFIG REQUIRED)", target: "spdlog::spdlog" },
    CMakeMapping { port: "openssl", find_package: "find_package(OpenSSL REQUIRED)", target: "OpenSSL::SSL OpenSSL::Crypto" },
    CMakeMapping { port: "curl", find_package: "find_package(CURL CONFIG REQUIRED)", target: "CURL::libcurl" },
    CMakeMapping { port: "sqlite3", find_package: "find_package(unofficial-sqlite3 CONFIG REQUIRED)", target: "unofficial::sqlite3::sqlite3" },
    CMakeMapping { port: "libpng", find_package: "find_package(PNG REQUIRED)", target: "PNG::PNG" },
    CMakeMapping { port: "nlohmann-json", find_package: "find_package(nlohmann_json CONFIG REQUIRED)", target: "nlohmann_json::nlohmann_json" },
    CMakeMapping { port: "gtest", find_package: "find_package(GTest CONFIG REQUIRED)", target: "GTest::gtest GTest::gtest_main" },
    CMakeMapping { port: "sdl2", find_package: "find_package(SDL2 CONFIG REQUIRED)", target: "SDL2::SDL2" },
    CMakeMapping { port: "glfw3", find_package: "find_package(glfw3 CONFIG REQUIRED)", target: "glfw" },
    CMakeMapping { port: "ncurses", find_package: "find_package(Curses REQUIRED)", target: "${CURSES_LIBRARIES}" },
];

/// The known mapping for `port`.
pub fn mapping_for(port: &str) -> Option<&'static CMakeMapping> {
    MAPPINGS.iter().find(|m| m.port.eq_ignore_ascii_case(port))
}

/// What a rewrite did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegrationReport {
    pub changed: bool,
    /// Declared dependencies with no known mapping
    pub unmapped: Vec<String>,
    /// Markers that were not found; their blocks were left untouched
    pub missing_markers: Vec<&'static str>,
}

impl IntegrationReport {
    /// User-facing warnings for this rewrite.
    pub fn warnings(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .unmapped
            .iter()
            .map(|name| {
                format!("no CMake mapping for `{name}`; wire it into CMakeLists.txt by hand")
            })
            .collect();
        for marker in &self.missing_markers {
            out.push(format!(
                "`{marker}` not found in CMakeLists.txt; dependency wiring skipped there"
            ));
        }
        out
    }
}

/// Rewrite the marker blocks of `content` for `manifest`.
pub fn render_cmakelists(content: &str, manifest: &ProjectManifest) -> (String, IntegrationReport) {
    let mut report = IntegrationReport::default();

    let mut find_lines = Vec::new();
    let mut targets = Vec::new();
    for dep in &manifest.dependencies {
        match mapping_for(&dep.name) {
            Some(mapping) => {
                find_lines.push(mapping.find_package.to_string());
                targets.push(mapping.target);
            }
            None => report.unmapped.push(dep.name.clone()),
        }
    }
    find_lines.sort();
    targets.sort();

    let mut link_lines = Vec::new();
    if !targets.is_empty() {
        link_lines.push(format!(
            "target_link_libraries({} PRIVATE {})",
            manifest.name,
            targets.join(" ")
        ));
    }

    let mut lines: Vec<String> = content.split_inclusive('\n').map(str::to_string).collect();
    replace_block(&mut lines, FIND_BEGIN, FIND_END, &find_lines, &mut report);
    replace_block(&mut lines, LINK_BEGIN, LINK_END, &link_lines, &mut report);
    let out = lines.concat();

    report.changed = out != content;
    (out, report)
}

/// Replace the lines between `begin` and the next `end` with `generated`.
///
/// A block with either marker missing is left as it is and reported.
fn replace_block(
    lines: &mut Vec<String>,
    begin: &'static str,
    end: &'static str,
    generated: &[String],
    report: &mut IntegrationReport,
) {
    let Some(start) = lines.iter().position(|l| l.trim() == begin) else {
        report.missing_markers.push(begin);
        return;
    };
    let Some(len) = lines[start + 1..].iter().position(|l| l.trim() == end) else {
        report.missing_markers.push(end);
        return;
    };

    let body = generated.iter().map(|line| format!("  {line}\n"));
    lines.splice(start + 1..start + 1 + len, body);
}

/// Rewrite `<project_root>/CMakeLists.txt`, skipping the write when nothing
/// changes. A project without CMakeLists.txt is left alone.
pub fn sync_cmakelists(project_root: &Path, manifest: &ProjectManifest) -> Result<IntegrationReport> {
    let path = project_root.join(CMAKELISTS_FILE);
    if !path.is_file() {
        tracing::debug!("no {} in {}", CMAKELISTS_FILE, project_root.display());
        return Ok(IntegrationReport::default());
    }

    let content = fs::read_to_string(&path)?;
    let (rendered, report) = render_cmakelists(&content, manifest);
    if report.changed {
        tracing::debug!("rewriting {}", path.display());
        fs::atomic_write(&path, &rendered)?;
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Dependency;

    const TEMPLATE: &str = "project(demo C)\n\
# relay:find-begin\n\
  find_package(Old REQUIRED)\n\
# relay:find-end\n\
add_executable(demo main.c)\n\
# relay:link-begin\n\
# relay:link-end\n";

    fn manifest(deps: &[&str]) -> ProjectManifest {
        let mut m = ProjectManifest::new("demo").unwrap();
        for d in deps {
            m.add_dependency(Dependency::new(d).unwrap()).unwrap();
        }
        m
    }

    #[test]
    fn test_blocks_are_regenerated_sorted() {
        let (out, report) = render_cmakelists(TEMPLATE, &manifest(&["zlib", "fmt"]));

        assert!(report.changed);
        assert!(report.unmapped.is_empty());
        assert!(report.missing_markers.is_empty());
        assert_eq!(
            out,
            "project(demo C)\n\
# relay:find-begin\n\
  find_package(ZLIB REQUIRED)\n\
  find_package(fmt CONFIG REQUIRED)\n\
# relay:find-end\n\
add_executable(demo main.c)\n\
# relay:link-begin\n\
  target_link_libraries(demo PRIVATE ZLIB::ZLIB fmt::fmt)\n\
# relay:link-end\n"
        );
    }

    #[test]
    fn test_rewrite_is_stable() {
        let (first, _) = render_cmakelists(TEMPLATE, &manifest(&["zlib"]));
        let (second, report) = render_cmakelists(&first, &manifest(&["zlib"]));
        assert_eq!(first, second);
        assert!(!report.changed);
    }

    #[test]
    fn test_no_dependencies_empties_blocks() {
        let (out, _) = render_cmakelists(TEMPLATE, &manifest(&[]));
        assert!(!out.contains("find_package"));
        assert!(!out.contains("target_link_libraries"));
        assert!(out.contains(FIND_END));
    }

    #[test]
    fn test_unmapped_and_missing_markers_warn() {
        let content = "project(demo C)\nadd_executable(demo main.c)\n";
        let (out, report) = render_cmakelists(content, &manifest(&["boost-asio"]));

        assert_eq!(out, content);
        assert!(!report.changed);
        assert_eq!(report.unmapped, ["boost-asio"]);
        assert_eq!(report.missing_markers, [FIND_BEGIN, LINK_BEGIN]);
        assert_eq!(report.warnings().len(), 3);
    }

    #[test]
    fn test_sync_writes_only_on_change() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join(CMAKELISTS_FILE);
        std::fs::write(&path, TEMPLATE).unwrap();

        assert!(sync_cmakelists(tmp.path(), &manifest(&["sdl2"])).unwrap().changed);
        assert!(std::fs::read_to_string(&path)
            .unwrap()
            .contains("target_link_libraries(demo PRIVATE SDL2::SDL2)"));
        assert!(!sync_cmakelists(tmp.path(), &manifest(&["sdl2"])).unwrap().changed);
    }

    #[test]
    fn test_unterminated_block_keeps_user_lines() {
        let content = "project(demo C)\n\
# relay:find-begin\n\
add_executable(demo main.c)\n\
install(TARGETS demo)\n\
# relay:link-begin\n\
# relay:link-end\n";
        let (out, report) = render_cmakelists(content, &manifest(&["zlib"]));

        assert!(out.contains("add_executable(demo main.c)\n"));
        assert!(out.contains("install(TARGETS demo)\n"));
        assert!(!out.contains("find_package"));
        assert!(out.contains("  target_link_libraries(demo PRIVATE ZLIB::ZLIB)\n"));
        assert_eq!(report.missing_markers, [FIND_END]);
        assert!(report.warnings()[0].contains(FIND_END));
    }
}
