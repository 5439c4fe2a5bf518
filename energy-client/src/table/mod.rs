pub mod unified;
pub mod view;

use std::collections::HashMap;

pub use unified::{materialize, rollup_rows, UnifiedTable};
pub use view::{most_recent, project, View, ViewKind};

use crate::domain::Record;

/// The frozen dataset: unified table plus every derived view. Built once,
/// then shared read-only (typically behind an `Arc`).
#[derive(Debug, Clone)]
pub struct Dataset {
    unified: UnifiedTable,
    views: HashMap<ViewKind, View>,
}

impl Dataset {
    /// Materialize rollups and project views from normalized concrete rows.
    pub fn build(concrete: Vec<Record>) -> Self {
        let unified = materialize(concrete);
        let views = project(&unified);
        Self { unified, views }
    }

    pub fn unified(&self) -> &UnifiedTable {
        &self.unified
    }

    pub fn view(&self, kind: ViewKind) -> &View {
        // project() inserts every kind
        &self.views[&kind]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Metric;
    use super::unified::tests::record;

    #[test]
    fn build_exposes_every_view() {
        let dataset =
            Dataset::build(vec![record(1, "MANHATTAN", 2016, &[(Metric::SourceEui, 1.0)])]);
        assert_eq!(dataset.unified().len(), 3);
        for kind in ViewKind::ALL {
            assert_eq!(dataset.view(kind).kind(), kind);
        }
        assert_eq!(dataset.view(ViewKind::Recent).len(), 1);
    }
}
