//! Property-based invariant tests for sensorview.
//!
//! 1. Alignment keeps every series on the shared, strictly increasing axis.
//! 2. Downsampling yields exactly `min(width, len)` points.
//! 3. Visible ranges stay inside the sequence.
//! 4. Navigation: pan is reversible and invalid zooms change nothing.

use proptest::prelude::*;
use sensorview::data::{align, bucket_bounds, downsample, Reading, Sample, Series};
use sensorview::nav::{ManualClock, TimeNavigator};
use sensorview::view::SequenceViewport;

// ── Strategies ──────────────────────────────────────────────────────────

fn reading() -> impl Strategy<Value = Reading> {
    prop_oneof![
        3 => (-1e6f64..1e6).prop_map(Reading::Present),
        1 => Just(Reading::Absent),
    ]
}

fn series_list() -> impl Strategy<Value = Vec<Series>> {
    prop::collection::vec(
        (
            0u8..4,
            prop::collection::vec((-500i32..500, reading()), 0..40),
        ),
        0..6,
    )
    .prop_map(|list| {
        list.into_iter()
            .map(|(id, points)| {
                Series::with_samples(
                    format!("s{id}"),
                    points
                        .into_iter()
                        .map(|(t, v)| Sample::new(f64::from(t), v))
                        .collect(),
                )
            })
            .collect()
    })
}

// ── Alignment ───────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn aligned_series_share_axis_length(series in series_list()) {
        let buf = align(&series);
        prop_assert!(buf.axis().windows(2).all(|w| w[0] < w[1]));
        for (_, values) in buf.iter() {
            prop_assert_eq!(values.len(), buf.len());
        }
        for s in &series {
            for sample in &s.samples {
                prop_assert!(buf.axis().contains(&sample.time));
            }
        }
    }

    #[test]
    fn present_values_land_on_their_time(series in series_list()) {
        let buf = align(&series);
        for s in &series {
            let values = buf.series(&s.id).unwrap();
            for (t, value) in buf.axis().iter().zip(values) {
                if let Reading::Present(v) = value {
                    let owners: Vec<&Series> = series.iter().filter(|o| o.id == s.id).collect();
                    let observed = owners
                        .iter()
                        .flat_map(|o| o.samples.iter())
                        .any(|sample| sample.time == *t && sample.value == Reading::Present(*v));
                    prop_assert!(observed);
                }
            }
        }
    }
}

// ── Downsampling ────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn downsample_length_is_min_of_width_and_len(series in series_list(), width in 0usize..64) {
        let buf = align(&series);
        let out = downsample(&buf, width);
        prop_assert_eq!(out.len(), width.min(buf.len()));
        prop_assert_eq!(out.series_count(), buf.series_count());
        prop_assert!(out.axis().windows(2).all(|w| w[0] < w[1]));
        if buf.len() <= width {
            prop_assert_eq!(out.as_ref(), &buf);
        }
    }

    #[test]
    fn buckets_tile_the_input(len in 1usize..5_000, width in 1usize..500) {
        prop_assume!(len > width);
        let mut next = 0;
        for i in 0..width {
            let bounds = bucket_bounds(i, len, width);
            prop_assert_eq!(bounds.start, next);
            prop_assert!(bounds.end <= len);
            prop_assert!(!bounds.is_empty());
            next = bounds.end;
        }
        prop_assert_eq!(next, len);
    }
}

// ── Viewport ────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn visible_range_is_in_bounds(
        extents in prop::collection::vec(0u32..60, 1..400),
        viewport in 0u32..800,
        overscan in 0usize..8,
        scroll in 0u64..30_000,
        shrink_to in 0usize..400,
    ) {
        let mut vp = SequenceViewport::new(24)
            .with_overscan(overscan)
            .with_viewport_extent(viewport);
        for &e in &extents {
            vp.push_measured(e);
        }
        vp.scroll_to(scroll);

        let range = vp.visible_range().unwrap();
        prop_assert!(range.first <= range.last);
        prop_assert!(range.last < extents.len());
        prop_assert_eq!(vp.visible_range(), Some(range));

        vp.set_total_count(shrink_to.min(extents.len()));
        prop_assert!(vp.scroll_offset() <= vp.max_scroll_offset());
        match vp.visible_range() {
            None => prop_assert!(vp.is_empty()),
            Some(r) => {
                prop_assert!(r.first <= r.last);
                prop_assert!(r.last < vp.len());
            }
        }
    }
}

// ── Navigation ──────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn pan_then_inverse_pan_restores_range(
        start in -1_000_000i64..1_000_000,
        span in 1i64..100_000,
        delta in -1_000_000i64..1_000_000,
    ) {
        let mut nav = TimeNavigator::new(ManualClock::new(0.0));
        let (s, e) = (start as f64, (start + span) as f64);
        nav.zoom_to(s, e);
        nav.pan_by(delta as f64);
        nav.pan_by(-delta as f64);
        prop_assert_eq!(nav.effective_range(), (s, e));
    }

    #[test]
    fn invalid_zoom_changes_nothing(
        a in -1e9f64..1e9,
        b in -1e9f64..1e9,
        live in any::<bool>(),
    ) {
        prop_assume!(b <= a);
        let mut nav = TimeNavigator::new(ManualClock::new(1_700_000_000.0));
        if !live {
            nav.zoom_to(10.0, 20.0);
        }
        let before = nav.range();
        let (_, rx) = nav.subscribe();
        prop_assert_eq!(nav.zoom_to(a, b), None);
        prop_assert_eq!(nav.range(), before);
        prop_assert!(rx.try_recv().is_err());
    }
}
