use camino::{Utf8Path, Utf8PathBuf};

macro_rules! define_paths {
    ($name:ident { $($field:ident : $default:expr),* $(,)? }) => {
        #[derive(Clone, Debug)]
        pub struct $name {
            $(pub $field: Utf8PathBuf,)*
        }

        impl $name {
            pub fn to_absolute(mut self, base: &Utf8Path) -> Self {
                $(self.$field = base.join(self.$field);)*
                self
            }

            pub fn new(base: &Utf8Path) -> Self {
                Self::default().to_absolute(base)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $($field: $default.into(),)*
                }
            }
        }
    };
}

define_paths!(StorePaths {
    packs: "packs",
    history: "history",
    journals: "journals",
    snapshots: "snapshots",
    library: "library.json",
});

impl StorePaths {
    pub fn pack_doc(&self, pack_id: &str) -> Utf8PathBuf {
        self.packs.join(format!("{pack_id}.json"))
    }

    pub fn history_doc(&self, pack_id: &str) -> Utf8PathBuf {
        self.history.join(format!("{pack_id}.json"))
    }

    pub fn journal_doc(&self, pack_id: &str) -> Utf8PathBuf {
        self.journals.join(format!("{pack_id}.json"))
    }

    pub fn snapshot_root(&self, pack_id: &str) -> Utf8PathBuf {
        self.snapshots.join(pack_id)
    }
}
