//! Property tests for visibility thresholds and sensor hysteresis.

use proptest::prelude::*;
use vista_layout::{ElementId, Rect, Thresholds, VisibilitySensor};

proptest! {
    #[test]
    fn exit_never_exceeds_enter(enter in -2.0f64..3.0, exit in -2.0f64..3.0) {
        let t = Thresholds::new(enter, exit);
        prop_assert!(t.exit() <= t.enter());
        prop_assert!((0.0..=1.0).contains(&t.enter()));
        prop_assert!((0.0..=1.0).contains(&t.exit()));
    }

    #[test]
    fn steps_are_strictly_increasing(
        steps in proptest::collection::vec(-1.0f64..2.0, 0..20),
    ) {
        let t = Thresholds::new(0.5, 0.2).with_steps(steps);
        for pair in t.steps().windows(2) {
            prop_assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn edges_alternate_starting_with_enter(
        enter in 0.0f64..1.0,
        exit in 0.0f64..1.0,
        tops in proptest::collection::vec(-900.0f64..900.0, 1..60),
    ) {
        let root = Rect::from_size(800.0, 600.0);
        let mut sensor =
            VisibilitySensor::observe(ElementId(1), Thresholds::new(enter, exit), true).unwrap();
        let mut inside = false;
        for top in tops {
            let Some(report) = sensor.measure(&Rect::new(0.0, top, 800.0, 400.0), &root) else {
                continue;
            };
            prop_assert!(!(report.crossed_enter && report.crossed_exit));
            if report.crossed_enter {
                prop_assert!(!inside);
                inside = true;
            }
            if report.crossed_exit {
                prop_assert!(inside);
                inside = false;
            }
            prop_assert_eq!(inside, sensor.is_inside());
        }
    }
}
