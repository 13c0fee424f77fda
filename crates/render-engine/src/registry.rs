//! Ordered registry of visual sources.
//!
//! Iteration order is ascending `index` (ties keep insertion order) and is
//! the order the render loop draws in, so later entries end up on top.

use indexmap::IndexMap;

use framemix_media_model::geometry::{Rect, Size};
use framemix_media_model::layout::grid_slot;
use framemix_media_model::source::{Placement, SourceRecord};

#[derive(Debug)]
pub struct SourceRegistry {
    canvas: Size,
    records: IndexMap<String, SourceRecord>,
}

impl SourceRegistry {
    /// Empty registry laying sources out on `canvas`.
    pub fn new(canvas: Size) -> Self {
        Self {
            canvas,
            records: IndexMap::new(),
        }
    }

    /// Canvas the current layout and vertices are computed for.
    pub fn canvas(&self) -> Size {
        self.canvas
    }

    /// Number of visual sources, explicit ones included.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether a record with `id` exists.
    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    /// Borrow the record with `id`.
    pub fn get(&self, id: &str) -> Option<&SourceRecord> {
        self.records.get(id)
    }

    /// Insert a record, replacing any record with the same id.
    ///
    /// Auto-placed records trigger a grid reflow over every auto-placed
    /// record; explicit ones leave the rest of the registry untouched.
    pub fn add(&mut self, mut record: SourceRecord) {
        record.refit(self.canvas);
        let id = record.id().to_string();
        let auto = record.is_auto_placed();
        let replaced = self.records.insert(id.clone(), record);
        if replaced.is_some() {
            tracing::debug!(source_id = %id, "Replaced existing source record");
        }
        self.sort();
        if auto || replaced.is_some_and(|old| old.is_auto_placed()) {
            self.reflow();
        }
    }

    /// Remove a record, stopping its media. Unknown ids are ignored.
    ///
    /// The source count changes, so auto-placed records are laid out again
    /// whether the removed record was auto-placed or explicit.
    pub fn remove(&mut self, id: &str) -> Option<SourceRecord> {
        let record = self.records.shift_remove(id)?;
        record.stop();
        self.reflow();
        Some(record)
    }

    /// Change a record's index and re-sort. Returns false for unknown ids.
    pub fn update_index(&mut self, id: &str, index: i64) -> bool {
        let Some(record) = self.records.get_mut(id) else {
            return false;
        };
        record.set_index(index);
        self.sort();
        true
    }

    /// Pin a record to a caller-supplied rectangle. Returns false for
    /// unknown ids.
    pub fn update_position(&mut self, id: &str, position: Rect) -> bool {
        let canvas = self.canvas;
        let Some(record) = self.records.get_mut(id) else {
            return false;
        };
        record.place(position, Placement::Explicit, canvas);
        true
    }

    /// Snapshot of all records in draw order.
    pub fn list(&self) -> Vec<SourceRecord> {
        self.records.values().cloned().collect()
    }

    /// Adapt every record to a new canvas size.
    pub fn resize(&mut self, canvas: Size) {
        self.canvas = canvas;
        for record in self.records.values_mut() {
            record.refit(canvas);
        }
        self.reflow();
    }

    /// Remove and stop every record.
    pub fn drain(&mut self) -> Vec<SourceRecord> {
        let records: Vec<_> = self.records.drain(..).map(|(_, record)| record).collect();
        for record in &records {
            record.stop();
        }
        records
    }

    fn sort(&mut self) {
        self.records.sort_by(|_, a, _, b| a.index().cmp(&b.index()));
    }

    /// Give every auto-placed record the grid slot of its position in draw
    /// order. Explicit records keep their rectangles but hold their slot.
    fn reflow(&mut self) {
        let count = self.records.len();
        let canvas = self.canvas;
        for (slot, record) in self.records.values_mut().enumerate() {
            if record.is_auto_placed() {
                record.place(grid_slot(slot, count, canvas), Placement::Auto, canvas);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framemix_media_model::geometry::to_drawing_space;
    use framemix_media_model::media::{MediaTrack, VideoFrame};
    use framemix_media_model::source::{
        ImageElement, LiveStream, MediaSource, SourceDescriptor, SourceKind,
    };
    use proptest::prelude::*;

    const CANVAS: Size = Size::new(1920, 1080);

    fn image() -> MediaSource {
        MediaSource::FileImage(ImageElement::new(VideoFrame::solid_rgb(2, 2, [5, 5, 5])))
    }

    fn auto(registry: &SourceRegistry, id: &str) -> SourceRecord {
        let descriptor = SourceDescriptor::visual(SourceKind::FileImage, image());
        SourceRecord::new(id.into(), registry.len() as i64, descriptor, registry.canvas())
    }

    fn explicit(registry: &SourceRegistry, id: &str, rect: Rect) -> SourceRecord {
        let descriptor =
            SourceDescriptor::visual(SourceKind::FileImage, image()).with_position(rect);
        SourceRecord::new(id.into(), registry.len() as i64, descriptor, registry.canvas())
    }

    fn positions(registry: &SourceRegistry) -> Vec<Rect> {
        registry.list().iter().map(SourceRecord::position).collect()
    }

    #[test]
    fn grid_reflows_as_auto_sources_arrive() {
        let mut registry = SourceRegistry::new(CANVAS);
        registry.add(auto(&registry, "a"));
        assert_eq!(positions(&registry), vec![Rect::full(CANVAS)]);

        registry.add(auto(&registry, "b"));
        registry.add(auto(&registry, "c"));
        assert_eq!(
            positions(&registry),
            vec![
                Rect::new(0, 0, 960, 540),
                Rect::new(960, 0, 960, 540),
                Rect::new(0, 540, 960, 540),
            ]
        );

        let three = positions(&registry);
        registry.add(auto(&registry, "d"));
        assert_eq!(positions(&registry)[3], Rect::new(960, 540, 960, 540));
        assert_eq!(&positions(&registry)[..3], &three[..]);
    }

    #[test]
    fn explicit_sources_do_not_move_others() {
        let mut registry = SourceRegistry::new(CANVAS);
        registry.add(auto(&registry, "a"));
        registry.add(auto(&registry, "b"));
        let before = positions(&registry);

        let pip = Rect::new(1500, 800, 320, 180);
        registry.add(explicit(&registry, "pip", pip));
        assert_eq!(&positions(&registry)[..2], &before[..]);
        assert_eq!(registry.get("pip").unwrap().position(), pip);

        // A later auto add reflows autos only.
        registry.add(auto(&registry, "c"));
        assert_eq!(registry.get("pip").unwrap().position(), pip);
        assert_eq!(registry.get("c").unwrap().position(), Rect::new(960, 540, 960, 540));
    }

    #[test]
    fn update_index_resorts() {
        let mut registry = SourceRegistry::new(CANVAS);
        for id in ["a", "b", "c"] {
            registry.add(auto(&registry, id));
        }
        assert!(registry.update_index("a", 10));
        assert!(!registry.update_index("missing", 0));

        let ids: Vec<_> = registry.list().iter().map(|r| r.id().to_string()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn equal_indices_keep_insertion_order() {
        let mut registry = SourceRegistry::new(CANVAS);
        for id in ["a", "b", "c"] {
            let descriptor = SourceDescriptor::visual(SourceKind::FileImage, image());
            registry.add(SourceRecord::new(id.into(), 1, descriptor, CANVAS));
        }
        let ids: Vec<_> = registry.list().iter().map(|r| r.id().to_string()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn update_position_pins_and_recomputes_vertices() {
        let mut registry = SourceRegistry::new(CANVAS);
        registry.add(auto(&registry, "a"));
        let rect = Rect::new(0, 0, 960, 540);
        assert!(registry.update_position("a", rect));

        let record = registry.get("a").unwrap();
        assert_eq!(record.placement(), Placement::Explicit);
        assert_eq!(*record.vertices(), to_drawing_space(rect, CANVAS));

        registry.add(auto(&registry, "b"));
        assert_eq!(registry.get("a").unwrap().position(), rect);
        assert!(!registry.update_position("missing", rect));
    }

    #[test]
    fn remove_stops_media_and_reflows() {
        let mut registry = SourceRegistry::new(CANVAS);
        let track = MediaTrack::video("cam");
        let descriptor = SourceDescriptor::visual(
            SourceKind::InputDevice,
            MediaSource::LiveStream(LiveStream::new(vec![track.clone()])),
        );
        registry.add(SourceRecord::new("cam".into(), 0, descriptor, CANVAS));
        registry.add(auto(&registry, "b"));

        let removed = registry.remove("cam").unwrap();
        assert_eq!(removed.id(), "cam");
        assert!(!track.is_live());
        assert_eq!(registry.get("b").unwrap().position(), Rect::full(CANVAS));
        assert!(registry.remove("cam").is_none());
    }

    #[test]
    fn removing_explicit_source_regrids_autos() {
        let mut registry = SourceRegistry::new(CANVAS);
        registry.add(explicit(&registry, "pip", Rect::new(1500, 800, 320, 180)));
        for id in ["a", "b", "c", "d"] {
            registry.add(auto(&registry, id));
        }
        assert_eq!(registry.get("a").unwrap().position(), Rect::new(640, 0, 640, 360));

        registry.remove("pip").unwrap();
        assert_eq!(
            positions(&registry),
            vec![
                Rect::new(0, 0, 960, 540),
                Rect::new(960, 0, 960, 540),
                Rect::new(0, 540, 960, 540),
                Rect::new(960, 540, 960, 540),
            ]
        );
    }

    #[test]
    fn duplicate_id_is_upserted() {
        let mut registry = SourceRegistry::new(CANVAS);
        registry.add(auto(&registry, "a"));
        let rect = Rect::new(10, 10, 100, 100);
        registry.add(explicit(&registry, "a", rect));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("a").unwrap().position(), rect);
    }

    #[test]
    fn resize_refits_layout_and_vertices() {
        let mut registry = SourceRegistry::new(CANVAS);
        registry.add(auto(&registry, "a"));
        registry.add(explicit(&registry, "pip", Rect::new(0, 0, 640, 360)));

        let canvas = Size::new(1280, 720);
        registry.resize(canvas);
        let a = registry.get("a").unwrap();
        assert_eq!(a.position(), Rect::new(0, 0, 640, 360));
        let pip = registry.get("pip").unwrap();
        assert_eq!(*pip.vertices(), to_drawing_space(Rect::new(0, 0, 640, 360), canvas));
    }

    #[test]
    fn drain_empties_and_stops() {
        let mut registry = SourceRegistry::new(CANVAS);
        let track = MediaTrack::video("cam");
        let descriptor = SourceDescriptor::visual(
            SourceKind::ScreenCapture,
            MediaSource::LiveStream(LiveStream::new(vec![track.clone()])),
        );
        registry.add(SourceRecord::new("screen".into(), 0, descriptor, CANVAS));
        assert_eq!(registry.drain().len(), 1);
        assert!(registry.is_empty());
        assert!(!track.is_live());
    }

    proptest! {
        #[test]
        fn list_is_sorted_after_any_updates(
            updates in proptest::collection::vec((0usize..8, -50i64..50), 0..32)
        ) {
            let mut registry = SourceRegistry::new(CANVAS);
            for i in 0..8 {
                registry.add(auto(&registry, &format!("s{i}")));
            }
            for (target, index) in updates {
                registry.update_index(&format!("s{target}"), index);
            }
            let indices: Vec<_> = registry.list().iter().map(SourceRecord::index).collect();
            prop_assert!(indices.windows(2).all(|w| w[0] <= w[1]));
        }

        #[test]
        fn auto_sources_never_overlap(count in 1usize..40) {
            let mut registry = SourceRegistry::new(CANVAS);
            for i in 0..count {
                registry.add(auto(&registry, &format!("s{i}")));
            }
            let rects = positions(&registry);
            for (i, a) in rects.iter().enumerate() {
                for b in &rects[i + 1..] {
                    prop_assert!(!a.intersects(b));
                }
            }
        }
    }
}
