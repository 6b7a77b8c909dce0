/// Which rule-synthesis strategy a package uses.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GroupingMode {
    /// One `cc_library` for the whole package directory.
    Directory,
    /// Run the grouping engine and emit one `cc_library` per group.
    Header,
}

impl Default for GroupingMode {
    fn default() -> Self {
        GroupingMode::Directory
    }
}

/// Immutable per-package configuration, cloned down the package tree.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct GroupingConfig {
    pub grouping_mode: GroupingMode,
}

impl GroupingConfig {
    /// Resolves this package's config from its parent and its own
    /// `cc_grouping_mode` directive, if any. An unrecognized directive
    /// value is logged and the parent's mode is kept.
    pub fn inherit(parent: &GroupingConfig, directive: Option<&str>) -> GroupingConfig {
        let grouping_mode = match directive {
            None | Some("default") => parent.grouping_mode,
            Some("directory") => GroupingMode::Directory,
            Some("header") => GroupingMode::Header,
            Some(other) => {
                log::warn!(
                    "unknown cc_grouping_mode directive '{other}', falling back to inherited value"
                );
                parent.grouping_mode
            }
        };
        GroupingConfig { grouping_mode }
    }
}

#[cfg(test)]
mod config_tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case(None, GroupingMode::Directory)]
    #[case(Some("default"), GroupingMode::Directory)]
    #[case(Some("header"), GroupingMode::Header)]
    #[case(Some("bogus"), GroupingMode::Directory)]
    fn inherits_or_falls_back(
        #[case] directive: Option<&str>,
        #[case] expected: GroupingMode,
    ) {
        let parent = GroupingConfig::default();
        let child = GroupingConfig::inherit(&parent, directive);
        assert_eq!(child.grouping_mode, expected);
    }

    #[rstest]
    fn child_overrides_parent_mode() {
        let parent = GroupingConfig { grouping_mode: GroupingMode::Header };
        let child = GroupingConfig::inherit(&parent, Some("directory"));
        assert_eq!(child.grouping_mode, GroupingMode::Directory);
    }
}
