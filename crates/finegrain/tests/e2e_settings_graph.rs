//! End-to-end exercise of a realistic settings graph: one source-of-truth
//! cell, zoomed field cells bound to "widgets", a derived summary view, and
//! a debounced save signal — the wiring a widget layer actually builds.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use finegrain::{Cell, ManualScheduler, Scheduler, pack2};

#[derive(Debug, Clone, PartialEq)]
struct Settings {
    volume: u32,
    muted: bool,
    theme: String,
}

fn default_settings() -> Settings {
    Settings {
        volume: 50,
        muted: false,
        theme: "dark".to_string(),
    }
}

#[test]
fn widget_graph_stays_consistent_through_edits() {
    let settings = Cell::new(default_settings());

    // Field cells, as a widget layer would build them.
    let volume = settings.zoom(|s| s.volume, |volume, s| Settings { volume, ..s.clone() });
    let muted = settings.zoom(|s| s.muted, |muted, s| Settings { muted, ..s.clone() });
    let theme = settings.zoom(
        |s| s.theme.clone(),
        |theme, s| Settings { theme, ..s.clone() },
    );

    // A label view derived across two fields.
    let audio = pack2(&volume, &muted);
    let label = audio.map(|(volume, muted)| {
        if *muted {
            "muted".to_string()
        } else {
            format!("{volume}%")
        }
    });

    let labels = Rc::new(RefCell::new(Vec::new()));
    let labels_clone = Rc::clone(&labels);
    let _label_sub = label.effect(
        move |new: &String, _| labels_clone.borrow_mut().push(new.clone()),
        true,
    );
    assert_eq!(*labels.borrow(), vec!["50%".to_string()]);

    // Slider drag.
    volume.set(75);
    assert_eq!(settings.get().volume, 75);
    assert_eq!(settings.get().theme, "dark");
    assert_eq!(labels.borrow().last().map(String::as_str), Some("75%"));

    // Mute toggle.
    muted.toggle();
    assert_eq!(labels.borrow().last().map(String::as_str), Some("muted"));

    // Editing an unrelated field does not disturb the audio label.
    let label_count = labels.borrow().len();
    theme.set("light".to_string());
    assert_eq!(labels.borrow().len(), label_count);
    assert_eq!(settings.get().theme, "light");

    // Unmute restores the numeric label with the preserved volume.
    muted.off();
    assert_eq!(labels.borrow().last().map(String::as_str), Some("75%"));
}

#[test]
fn debounced_save_signal_fires_once_per_edit_burst() {
    let clock = ManualScheduler::new();
    let scheduler: Rc<dyn Scheduler> = Rc::new(clock.clone());

    let settings = Cell::new(default_settings());
    let volume = settings.zoom(|s| s.volume, |volume, s| Settings { volume, ..s.clone() });
    let save_signal = settings.debounce(Duration::from_millis(200), &scheduler);

    let saves = Rc::new(RefCell::new(Vec::new()));
    let saves_clone = Rc::clone(&saves);
    let _save_sub = save_signal.effect(
        move |new: &Settings, _| saves_clone.borrow_mut().push(new.clone()),
        false,
    );

    // A drag burst: many volume updates in quick succession.
    for step in [55, 60, 65, 70] {
        volume.set(step);
        clock.advance(Duration::from_millis(30));
    }
    assert!(saves.borrow().is_empty(), "no save mid-burst");

    clock.advance(Duration::from_millis(200));
    assert_eq!(saves.borrow().len(), 1);
    assert_eq!(saves.borrow()[0].volume, 70);

    // A later single edit saves once more.
    volume.set(10);
    clock.advance(Duration::from_millis(200));
    assert_eq!(saves.borrow().len(), 2);
    assert_eq!(saves.borrow()[1].volume, 10);
}

#[test]
fn teardown_releases_the_whole_chain() {
    let settings = Cell::new(default_settings());
    let volume = settings.zoom(|s| s.volume, |volume, s| Settings { volume, ..s.clone() });
    let label = volume.map(|v| format!("{v}%"));

    assert_eq!(settings.downstream_count(), 0);

    let sub = label.effect(|_, _| {}, false);
    assert_eq!(settings.downstream_count(), 1);
    assert_eq!(volume.downstream_count(), 1);

    drop(sub);
    assert_eq!(settings.downstream_count(), 0);
    assert_eq!(volume.downstream_count(), 0);

    // The graph still reads correctly after teardown.
    volume.set(5);
    assert_eq!(label.get(), "5%");
    assert_eq!(settings.get().volume, 5);
}
