//! Extension-based categorization of directory entries.
//!
//! A [`CategoryMapper`] holds an ordered list of extension groups and the
//! display folder name for each category. Classification is a pure lookup:
//! directories are always [`Category::folder`], files are matched by their
//! lowercase extension against the groups in order, and anything unmatched
//! lands in [`Category::other`].
//!
//! # Examples
//!
//! ```
//! use desktidy::file_category::{Category, CategoryMapper};
//!
//! let mapper = CategoryMapper::default();
//! assert_eq!(mapper.classify("holiday.JPG", false), Category::new("Image"));
//! assert_eq!(mapper.classify("notes.txt", false), Category::new("Document"));
//! assert_eq!(mapper.classify("mystery.xyz", false), Category::other());
//! assert_eq!(mapper.classify("photos.jpg", true), Category::folder());
//! ```
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Label reserved for directory entries. Never a move target.
pub const FOLDER_LABEL: &str = "Folder";
/// Label of the catch-all category for unmatched extensions.
pub const OTHER_LABEL: &str = "Other";

/// Suffix appended to a resolved folder name to form its archive container.
const ARCHIVE_SUFFIX: &str = "_Archive.zip";

/// A classification bucket such as `Image`, `Video` or `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Category(String);

impl Category {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// The reserved category for directories.
    pub fn folder() -> Self {
        Self(FOLDER_LABEL.to_string())
    }

    /// The catch-all category.
    pub fn other() -> Self {
        Self(OTHER_LABEL.to_string())
    }

    pub fn label(&self) -> &str {
        &self.0
    }

    pub fn is_folder(&self) -> bool {
        self.0 == FOLDER_LABEL
    }

    pub fn is_other(&self) -> bool {
        self.0 == OTHER_LABEL
    }

    /// Returns true for labels the classifier assigns on its own.
    pub fn is_reserved_label(label: &str) -> bool {
        label == FOLDER_LABEL || label == OTHER_LABEL
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Returns the lowercase extension of `name`, including the leading dot.
///
/// Leading dots are not treated as extension separators, so dotfiles such as
/// `.bashrc` have no extension. Only the final extension counts:
/// `backup.tar.gz` yields `.gz`.
///
/// ```
/// use desktidy::file_category::extension_of;
///
/// assert_eq!(extension_of("Photo.JPG"), ".jpg");
/// assert_eq!(extension_of("backup.tar.gz"), ".gz");
/// assert_eq!(extension_of(".bashrc"), "");
/// assert_eq!(extension_of("README"), "");
/// ```
pub fn extension_of(name: &str) -> String {
    let trimmed = name.trim_start_matches('.');
    match trimmed.rfind('.') {
        Some(index) => trimmed[index..].to_lowercase(),
        None => String::new(),
    }
}

/// Normalizes a configured extension to the form produced by [`extension_of`].
///
/// `"JPG"`, `".jpg"` and `" .Jpg "` all become `".jpg"`. An empty string stays
/// empty and matches files without an extension.
pub fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.is_empty() || ext.starts_with('.') {
        ext
    } else {
        format!(".{}", ext)
    }
}

/// Maps file extensions to categories and categories to folder names.
#[derive(Debug, Clone)]
pub struct CategoryMapper {
    groups: Vec<(Category, HashSet<String>)>,
    folder_names: HashMap<Category, String>,
}

impl CategoryMapper {
    /// Creates a mapper with no extension groups: every file classifies as `Other`.
    pub fn empty() -> Self {
        Self {
            groups: Vec::new(),
            folder_names: HashMap::new(),
        }
    }

    /// The built-in groups used when no configuration supplies any.
    pub fn with_standard_groups() -> Self {
        let mut mapper = Self::empty();
        mapper.add_group(
            Category::new("Image"),
            [".jpg", ".jpeg", ".png", ".gif", ".bmp", ".tiff", ".webp"],
        );
        mapper.add_group(
            Category::new("Video"),
            [".mp4", ".avi", ".mkv", ".mov", ".webm", ".flv"],
        );
        mapper.add_group(
            Category::new("Audio"),
            [".mp3", ".wav", ".flac", ".aac", ".wma"],
        );
        mapper.add_group(
            Category::new("Document"),
            [".pdf", ".docx", ".doc", ".txt", ".odt"],
        );
        mapper.add_group(Category::new("Executable"), [".exe", ".msi"]);
        mapper
    }

    /// Appends an extension group. Adding to an existing category extends it
    /// in place, keeping its original position in the match order.
    pub fn add_group<I, S>(&mut self, category: Category, extensions: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let normalized = extensions
            .into_iter()
            .map(|ext| normalize_extension(ext.as_ref()));

        match self.groups.iter_mut().find(|(c, _)| *c == category) {
            Some((_, set)) => set.extend(normalized),
            None => self.groups.push((category, normalized.collect())),
        }
    }

    /// Overrides the folder a category's files are moved into.
    pub fn set_folder_name(&mut self, category: Category, name: impl Into<String>) {
        self.folder_names.insert(category, name.into());
    }

    /// Looks up the first group containing `ext`.
    pub fn extension_to_category(&self, ext: &str) -> Option<&Category> {
        let ext = normalize_extension(ext);
        self.groups
            .iter()
            .find(|(_, extensions)| extensions.contains(&ext))
            .map(|(category, _)| category)
    }

    /// Classifies a directory entry by name.
    pub fn classify(&self, name: &str, is_directory: bool) -> Category {
        if is_directory {
            return Category::folder();
        }

        self.extension_to_category(&extension_of(name))
            .cloned()
            .unwrap_or_else(Category::other)
    }

    /// Every category that gets a folder: configured groups in order, then `Other`.
    pub fn categories(&self) -> Vec<Category> {
        self.groups
            .iter()
            .map(|(category, _)| category.clone())
            .filter(|category| !category.is_other())
            .chain(std::iter::once(Category::other()))
            .collect()
    }

    /// Resolves the folder name for a category, falling back to its label.
    pub fn folder_name<'a>(&'a self, category: &'a Category) -> &'a str {
        self.folder_names
            .get(category)
            .map(String::as_str)
            .unwrap_or_else(|| category.label())
    }

    /// True if `name` is the label or resolved folder of any provisioned category.
    pub fn is_category_folder(&self, name: &str) -> bool {
        self.categories()
            .iter()
            .any(|category| category.label() == name || self.folder_name(category) == name)
    }

    /// File name of the archive container for a category.
    pub fn archive_container_name(&self, category: &Category) -> String {
        format!("{}{}", self.folder_name(category), ARCHIVE_SUFFIX)
    }

    /// True if `name` is the archive container of any provisioned category.
    pub fn is_archive_container(&self, name: &str) -> bool {
        self.categories()
            .iter()
            .any(|category| self.archive_container_name(category) == name)
    }
}

impl Default for CategoryMapper {
    fn default() -> Self {
        Self::with_standard_groups()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn custom_mapper() -> CategoryMapper {
        let mut mapper = CategoryMapper::empty();
        mapper.add_group(Category::new("Image"), [".jpg", ".png"]);
        mapper.add_group(Category::new("Document"), ["txt", "PDF"]);
        mapper
    }

    #[test]
    fn test_registered_extensions_map_to_their_category() {
        let mapper = custom_mapper();
        assert_eq!(mapper.classify("a.jpg", false), Category::new("Image"));
        assert_eq!(mapper.classify("b.png", false), Category::new("Image"));
        assert_eq!(mapper.classify("c.txt", false), Category::new("Document"));
        assert_eq!(mapper.classify("d.pdf", false), Category::new("Document"));
    }

    #[test]
    fn test_classification_is_case_insensitive() {
        let mapper = custom_mapper();
        assert_eq!(mapper.classify("SHOUT.JPG", false), Category::new("Image"));
        assert_eq!(mapper.classify("Report.Pdf", false), Category::new("Document"));
    }

    #[test]
    fn test_unregistered_extension_is_other() {
        let mapper = custom_mapper();
        assert_eq!(mapper.classify("song.mp3", false), Category::other());
        assert_eq!(mapper.classify("Makefile", false), Category::other());
        assert_eq!(mapper.classify(".hidden", false), Category::other());
    }

    #[test]
    fn test_directories_are_always_folder() {
        let mapper = custom_mapper();
        assert_eq!(mapper.classify("photos.jpg", true), Category::folder());
        assert_eq!(mapper.classify("Image", true), Category::folder());
    }

    #[test]
    fn test_first_matching_group_wins() {
        let mut mapper = CategoryMapper::empty();
        mapper.add_group(Category::new("Text"), [".md"]);
        mapper.add_group(Category::new("Docs"), [".md", ".rst"]);

        assert_eq!(mapper.classify("README.md", false), Category::new("Text"));
        assert_eq!(mapper.classify("index.rst", false), Category::new("Docs"));
    }

    #[test]
    fn test_empty_extension_group_matches_extensionless_files() {
        let mut mapper = CategoryMapper::empty();
        mapper.add_group(Category::new("Plain"), [""]);
        assert_eq!(mapper.classify("LICENSE", false), Category::new("Plain"));
        assert_eq!(mapper.classify("a.txt", false), Category::other());
    }

    #[test]
    fn test_categories_end_with_other_once() {
        let mapper = custom_mapper();
        let labels: Vec<String> = mapper
            .categories()
            .iter()
            .map(|c| c.label().to_string())
            .collect();
        assert_eq!(labels, vec!["Image", "Document", "Other"]);
    }

    #[test]
    fn test_folder_name_falls_back_to_label() {
        let mut mapper = custom_mapper();
        mapper.set_folder_name(Category::new("Image"), "Pictures");

        assert_eq!(mapper.folder_name(&Category::new("Image")), "Pictures");
        assert_eq!(mapper.folder_name(&Category::new("Document")), "Document");
        assert_eq!(mapper.folder_name(&Category::other()), "Other");
    }

    #[test]
    fn test_category_folder_matches_label_and_custom_name() {
        let mut mapper = custom_mapper();
        mapper.set_folder_name(Category::new("Image"), "Pictures");

        assert!(mapper.is_category_folder("Pictures"));
        assert!(mapper.is_category_folder("Image"));
        assert!(mapper.is_category_folder("Other"));
        assert!(!mapper.is_category_folder("Projects"));
    }

    #[test]
    fn test_archive_container_names_use_resolved_folder() {
        let mut mapper = custom_mapper();
        mapper.set_folder_name(Category::new("Image"), "Pictures");

        assert_eq!(
            mapper.archive_container_name(&Category::new("Image")),
            "Pictures_Archive.zip"
        );
        assert!(mapper.is_archive_container("Other_Archive.zip"));
        assert!(!mapper.is_archive_container("Image_Archive.zip"));
    }

    #[test]
    fn test_extension_of_edge_cases() {
        assert_eq!(extension_of("archive.TAR.GZ"), ".gz");
        assert_eq!(extension_of("trailing."), ".");
        assert_eq!(extension_of("..double"), "");
        assert_eq!(extension_of(".config.json"), ".json");
    }

    #[test]
    fn test_standard_groups() {
        let mapper = CategoryMapper::with_standard_groups();
        assert_eq!(mapper.classify("setup.exe", false), Category::new("Executable"));
        assert_eq!(mapper.classify("clip.mkv", false), Category::new("Video"));
        assert_eq!(mapper.classify("track.flac", false), Category::new("Audio"));
    }
}
