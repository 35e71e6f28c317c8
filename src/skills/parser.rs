//! Turning directories into [`SkillPackage`] values.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use tracing::warn;

use crate::error::{Result, RunnerError};
use crate::skills::frontmatter::{parse_frontmatter, split_frontmatter};
use crate::skills::inference::inferred_meta_and_body;
use crate::skills::model::{SkillPackage, SkillResources};

const DESCRIPTOR_NAMES: [&str; 2] = ["SKILL.md", "skill.md"];
const RESOURCE_DIRS: [&str; 3] = ["scripts", "references", "assets"];

/// Parse one skill directory.
///
/// `SKILL.md` is preferred over `skill.md`. A descriptor opening with a YAML
/// frontmatter block follows the formal convention; otherwise metadata is
/// inferred from the directory name and the markdown structure. A descriptor
/// with neither frontmatter nor a top-level heading is rejected.
pub fn parse_skill_package(path: impl AsRef<Path>) -> Result<SkillPackage> {
    let path = path.as_ref();
    if !path.is_dir() {
        return Err(RunnerError::SkillDirectoryNotFound(path.to_path_buf()));
    }

    let descriptor = DESCRIPTOR_NAMES
        .iter()
        .map(|name| path.join(name))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| RunnerError::DescriptorMissing(path.to_path_buf()))?;

    let content = fs::read_to_string(&descriptor)?;
    let dir_name = path
        .file_name()
        .and_then(OsStr::to_str)
        .unwrap_or_default();

    let (meta, body) = match split_frontmatter(&content) {
        Some((yaml, body)) => {
            let meta = parse_frontmatter(&descriptor, &yaml)?;
            (meta, body.trim().to_string())
        }
        None => {
            if !has_top_level_heading(&content) {
                return Err(RunnerError::MissingFrontmatter(descriptor));
            }
            inferred_meta_and_body(dir_name, &content)
        }
    };

    Ok(SkillPackage {
        path: path.to_path_buf(),
        meta,
        body,
        resources: SkillResources {
            scripts: collect_resources(path, "scripts"),
            references: collect_resources(path, "references"),
            assets: collect_resources(path, "assets"),
        },
    })
}

/// Recursively discover and parse every skill under `root`.
///
/// Directories whose name starts with `.` are skipped, as are
/// `.claude-plugin` and a top-level `document-skills` folder. A directory
/// that parses as a skill is not descended into. Individual skill failures
/// are logged and skipped; only an unreadable root is an error.
pub fn parse_skill_packages(root: impl AsRef<Path>) -> Result<Vec<SkillPackage>> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Err(RunnerError::SkillDirectoryNotFound(root.to_path_buf()));
    }

    let mut packages = Vec::new();
    visit(root, root, &mut packages)?;
    Ok(packages)
}

fn visit(root: &Path, dir: &Path, out: &mut Vec<SkillPackage>) -> Result<()> {
    if has_descriptor(dir) {
        match parse_skill_package(dir) {
            Ok(package) => out.push(package),
            Err(error) => warn!(path = %dir.display(), %error, "skipping unparseable skill"),
        }
        return Ok(());
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(error) => {
            if dir == root {
                return Err(error.into());
            }
            warn!(path = %dir.display(), %error, "skipping unreadable directory");
            return Ok(());
        }
    };

    let mut subdirs: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    subdirs.sort();

    for subdir in subdirs {
        let name = subdir
            .file_name()
            .and_then(OsStr::to_str)
            .unwrap_or_default();
        if name.starts_with('.') || name == ".claude-plugin" {
            continue;
        }
        if dir == root && name == "document-skills" {
            continue;
        }
        visit(root, &subdir, out)?;
    }

    Ok(())
}

fn has_descriptor(dir: &Path) -> bool {
    DESCRIPTOR_NAMES
        .iter()
        .any(|name| dir.join(name).is_file())
}

fn has_top_level_heading(content: &str) -> bool {
    content.lines().any(|line| {
        let trimmed = line.trim_start();
        trimmed.starts_with('#') && !trimmed.starts_with("##")
    })
}

/// Enumerate regular files under one resource subdirectory, returning paths
/// relative to the skill root in sorted order. A missing subdirectory yields
/// an empty list.
fn collect_resources(skill_root: &Path, subdir: &str) -> Vec<PathBuf> {
    debug_assert!(RESOURCE_DIRS.contains(&subdir));
    let dir = skill_root.join(subdir);
    if !dir.is_dir() {
        return Vec::new();
    }

    let mut builder = WalkBuilder::new(&dir);
    builder
        .hidden(false)
        .ignore(false)
        .git_ignore(false)
        .git_exclude(false)
        .git_global(false)
        .parents(false);

    let mut files = Vec::new();
    for entry in builder.build().flatten() {
        let is_file = entry
            .file_type()
            .map(|file_type| file_type.is_file())
            .unwrap_or(false);
        if !is_file {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(skill_root) {
            files.push(relative.to_path_buf());
        }
    }
    files.sort();
    files
}
