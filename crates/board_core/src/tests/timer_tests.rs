use super::*;

#[test]
fn starts_paused_with_the_configured_duration() {
    let timer = TimerEngine::default();
    assert_eq!(
        timer.state(),
        TimerState {
            seconds: 300,
            state: TimerPhase::Paused
        }
    );
    assert_eq!(timer.display(), "05:00");
}

#[test]
fn counts_down_to_zero_once() {
    let mut timer = TimerEngine::new(5);
    timer.play();
    assert_eq!(
        timer.take_outbound(),
        Some(RoomEvent::PlayTimer(TimerPayload {
            seconds: Some(5),
            state: TimerPhase::Play
        }))
    );

    let ticks: Vec<TimerTick> = (0..5).map(|_| timer.tick()).collect();
    assert_eq!(
        ticks,
        [
            TimerTick::Counted,
            TimerTick::Counted,
            TimerTick::Counted,
            TimerTick::Counted,
            TimerTick::Completed
        ]
    );
    assert_eq!(timer.state().seconds, 0);

    assert_eq!(timer.tick(), TimerTick::Idle);
    assert_eq!(timer.state().seconds, 0);
    assert_eq!(timer.take_outbound(), None, "ticks stay local");
}

#[test]
fn paused_timer_does_not_tick() {
    let mut timer = TimerEngine::new(5);
    timer.play();
    timer.tick();
    timer.pause();
    assert_eq!(
        timer.take_outbound(),
        Some(RoomEvent::PauseTimer(TimerPayload {
            seconds: Some(4),
            state: TimerPhase::Paused
        }))
    );
    assert_eq!(timer.tick(), TimerTick::Idle);
    assert_eq!(timer.state().seconds, 4);
}

#[test]
fn stop_forces_zero() {
    let mut timer = TimerEngine::new(90);
    timer.play();
    timer.stop();
    assert_eq!(
        timer.state(),
        TimerState {
            seconds: 0,
            state: TimerPhase::Stopped
        }
    );
    assert_eq!(
        timer.take_outbound(),
        Some(RoomEvent::StopTimer(TimerPayload {
            seconds: Some(0),
            state: TimerPhase::Stopped
        }))
    );
}

#[test]
fn duration_fields_are_clamped() {
    let mut timer = TimerEngine::default();
    assert!(timer.set_duration(2, 30));
    assert_eq!(timer.state().seconds, 150);
    assert!(timer.set_duration(75, 99));
    assert_eq!(timer.display(), "59:59");
    assert!(!timer.set_duration(59, 59));
    assert_eq!(timer.take_outbound(), None);
}

#[test]
fn remote_stop_without_seconds_still_zeroes() {
    let mut timer = TimerEngine::new(120);
    assert!(timer.apply_remote(TimerPayload {
        seconds: None,
        state: TimerPhase::Stopped,
    }));
    assert_eq!(timer.state().seconds, 0);

    assert!(timer.apply_remote(TimerPayload {
        seconds: Some(60),
        state: TimerPhase::Play,
    }));
    assert!(!timer.apply_remote(TimerPayload {
        seconds: Some(60),
        state: TimerPhase::Play,
    }));
    assert_eq!(timer.take_outbound(), None);
}

#[test]
fn formats_minutes_and_seconds() {
    assert_eq!(format_mm_ss(0), "00:00");
    assert_eq!(format_mm_ss(61), "01:01");
    assert_eq!(format_mm_ss(3600), "60:00");
}
