// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Finish node: finish-line sensors and lane time displays.
//!
//! The Finish node follows the Start node through Idle, Staging and Countdown, and originates the two
//! transitions that depend on its sensors: Racing -> Complete once both lanes have a time, and
//! Complete -> Idle once the operator has paged through the results.

use crate::capture::FinishSensors;
use crate::error::ErrorCode;
use crate::link::{Inbox, Outbox, TxStatus};
use crate::node::{Now, Port};
use crate::peripherals::TimeDisplay;
use crate::protocol::{FoulMask, Message, Uid};
use crate::race::{
    Announce, Lane, Lanes, RaceMode, RaceResults, RaceState, RaceTimingData, StateMachine, Step,
};
use crate::time::Clock;

const OUTBOX_LEN: usize = 4;

pub struct FinishNode<'a, P, D> {
    port: P,
    display: D,
    sensors: &'a FinishSensors,
    state: StateMachine<RaceState>,
    mode: StateMachine<RaceMode>,
    mailbox: Inbox,
    outbox: Outbox<OUTBOX_LEN>,
    timing: RaceTimingData,
    results: RaceResults,
    car_ids: Lanes<Option<Uid>>,
    /// Reaction times still have to be shown before the next display advance returns to Idle.
    need_react: bool,
    armed: bool,
}

impl<'a, P, D> FinishNode<'a, P, D>
where
    P: Port,
    D: TimeDisplay,
{
    pub fn new(port: P, display: D, sensors: &'a FinishSensors) -> Self {
        let mut mode = StateMachine::new(RaceMode::GateDrop);
        mode.take_entry();

        Self {
            port,
            display,
            sensors,
            state: StateMachine::new(RaceState::Idle),
            mode,
            mailbox: Inbox::new(),
            outbox: Outbox::new(),
            timing: RaceTimingData::new(),
            results: RaceResults::new(),
            car_ids: Lanes::splat(None),
            need_react: false,
            armed: false,
        }
    }

    #[inline]
    pub fn state(&self) -> RaceState {
        self.state.current()
    }

    #[inline]
    pub fn mode(&self) -> RaceMode {
        self.mode.current()
    }

    #[inline]
    pub fn results(&self) -> &RaceResults {
        &self.results
    }

    #[inline]
    pub fn car_id(&self, lane: Lane) -> Option<Uid> {
        *self.car_ids.get(lane)
    }

    #[inline]
    pub fn port(&self) -> &P {
        &self.port
    }

    #[inline]
    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn tick<C: Clock>(&mut self, clock: &C) {
        let now = Now::sample(clock);

        let rx = self.port.poll();
        self.mailbox.merge(rx);
        if let Some(code) = self.mailbox.error.take() {
            warn!("finish: peer reported {}", code);
        }

        if let Some(step) = self.state.poll(&mut self.port, now.ms) {
            self.note_step::<RaceState>(step);
        }

        for lane in Lane::ALL {
            if let Some(uid) = self.mailbox.car_id.get_mut(lane).take() {
                info!("finish: car {} on {}", uid, lane);
                *self.car_ids.get_mut(lane) = Some(uid);
            }
        }

        if let Some(prev) = self.state.take_exit() {
            self.exit(prev);
        }
        if self.state.take_entry() {
            self.enter(now);
        }

        match self.state.current() {
            RaceState::Idle => self.idle(),
            RaceState::Staging => {}
            RaceState::Countdown => self.countdown(now),
            RaceState::Racing => self.racing(now),
            RaceState::Complete => self.complete(now),
            RaceState::Test => self.request(RaceState::Idle, now),
        }

        if let Some(next) = self.mailbox.state.take() {
            let step = self.state.rx_transition(next, &mut self.port);
            self.note_step::<RaceState>(step);
        }

        if let Some((msg, status)) = self.outbox.poll(&mut self.port, now.ms) {
            if status != TxStatus::Acked {
                warn!("finish: {} not delivered: {}", msg.id(), status);
            }
        }
    }

    fn exit(&mut self, prev: RaceState) {
        debug!("finish: exit {}", prev);
        match prev {
            RaceState::Racing => {
                self.sensors.disarm();
                self.armed = false;
            }
            RaceState::Complete => {
                self.results.reset();
                self.car_ids = Lanes::splat(None);
            }
            _ => {}
        }
    }

    fn enter(&mut self, now: Now) {
        let state = self.state.current();
        info!("finish: enter {}", state);

        match state {
            RaceState::Idle => {
                for lane in Lane::ALL {
                    self.display.clear(lane);
                }
            }
            RaceState::Countdown => {
                self.timing = RaceTimingData::new();
                self.armed = false;
                self.mailbox.race_start = None;
            }
            RaceState::Racing => {
                self.timing.recorded = Lanes::splat(false);
                self.mailbox.reaction = Lanes::splat(None);
                self.mailbox.foul = None;
                for lane in Lane::ALL {
                    let result = self.results.lane_mut(lane);
                    result.foul = false;
                    result.reaction_time_us = 0;
                }
                if !self.armed {
                    // Race start was lost or arrived with the state change; time from now.
                    warn!("finish: racing without a start signal");
                    self.arm(now);
                }
            }
            RaceState::Complete => self.publish_results(),
            RaceState::Staging | RaceState::Test => {}
        }
    }

    fn idle(&mut self) {
        if let Some(mode) = self.mailbox.mode.take() {
            let step = self.mode.rx_transition(mode, &mut self.port);
            if self.mode.take_entry() {
                info!("finish: mode {}", self.mode.current());
            }
            self.note_step::<RaceMode>(step);
        }
    }

    fn countdown(&mut self, now: Now) {
        if let Some(mask) = self.mailbox.race_start.take() {
            if mask.is_race() && !self.armed {
                self.arm(now);
            }
        }
    }

    fn arm(&mut self, now: Now) {
        self.timing.begin(now.us);
        self.sensors.arm(now.us);
        self.armed = true;
    }

    fn racing(&mut self, now: Now) {
        if self.mailbox.race_start.take().is_some() {
            debug!("finish: late race start ignored");
        }

        let forced = self.sensors.enforce_max(now.us);
        for lane in Lane::ALL {
            if *forced.get(lane) {
                warn!("finish: {} did not finish", lane);
            }
            if let Some(elapsed) = self.sensors.finish_time(lane) {
                if self.timing.record(lane, elapsed) {
                    info!("finish: {} finished in {} us", lane, elapsed);
                }
            }
            if let Some(reaction) = self.mailbox.reaction.get_mut(lane).take() {
                self.results.lane_mut(lane).reaction_time_us = reaction;
            }
        }
        if let Some(mask) = self.mailbox.foul.take() {
            for lane in Lane::ALL {
                self.results.lane_mut(lane).foul |= mask.is_fouled(lane);
            }
        }

        if self.timing.all_recorded() {
            self.request(RaceState::Complete, now);
        }
    }

    fn publish_results(&mut self) {
        self.need_react = false;
        self.mailbox.display_advance = false;

        for lane in Lane::ALL {
            self.results.lane_mut(lane).car_id = *self.car_ids.get(lane);
        }
        self.results.compute(self.timing.lane_us);
        for lane in Lane::ALL {
            self.display.show_time(lane, self.results.lane(lane).car_time_us);
        }
        self.need_react = self.mode.current() != RaceMode::GateDrop;

        let winner = self.results.winner_mask();
        info!("finish: winner {}", winner);
        if self.outbox.push(Message::Winner(winner)).is_err() {
            warn!("finish: outbox full, winner dropped");
        }
    }

    fn complete(&mut self, now: Now) {
        // A display advance waits in the mailbox until the winner has been delivered.
        if self.state.in_flight() || !self.outbox.is_idle() {
            return;
        }
        if self.mailbox.take_display_advance() {
            if self.need_react {
                for lane in Lane::ALL {
                    self.display.show_time(lane, self.results.lane(lane).reaction_time_us);
                }
                self.need_react = false;
            } else {
                self.request(RaceState::Idle, now);
            }
        }
    }

    fn request(&mut self, next: RaceState, now: Now) {
        if self.state.in_flight() {
            return;
        }
        let step = self.state.self_transition(next, &mut self.port, now.ms);
        self.note_step::<RaceState>(step);
    }

    fn note_step<S: Announce>(&mut self, step: Step) {
        let code = match step {
            Step::Abandoned => S::TIMEOUT_CODE,
            Step::Overridden => ErrorCode::StateMismatch,
            _ => return,
        };
        self.port.record(code);
        if self.outbox.push(Message::Error(code)).is_err() {
            warn!("finish: outbox full, {} dropped", code);
        }
    }

    /// Fouls reported by the Start node for the race in progress.
    pub fn fouls(&self) -> FoulMask {
        FoulMask::from_flags(
            self.results.lane(Lane::Left).foul,
            self.results.lane(Lane::Right).foul,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SensorConfig;
    use crate::protocol::{MsgId, StartMask, WinnerMask};
    use crate::test_support::{AckPort, RecordingDisplay, SimClock};

    fn run<'a>(node: &mut FinishNode<'a, AckPort, RecordingDisplay>, clock: &mut SimClock, ms: u32) {
        let until = clock.ms + ms;
        while clock.ms < until {
            node.tick(clock);
            clock.advance_ms(1);
        }
    }

    fn to_racing<'a>(
        node: &mut FinishNode<'a, AckPort, RecordingDisplay>,
        clock: &mut SimClock,
        mode: RaceMode,
    ) {
        node.port.push_rx(Message::RaceMode(mode));
        node.port.push_rx(Message::RaceState(RaceState::Staging));
        node.port.push_rx(Message::RaceState(RaceState::Countdown));
        run(node, clock, 10);
        assert_eq!(node.state(), RaceState::Countdown);
        node.port.push_rx(Message::RaceStart(StartMask::race()));
        node.port.push_rx(Message::RaceState(RaceState::Racing));
        run(node, clock, 10);
        assert_eq!(node.state(), RaceState::Racing);
    }

    #[test]
    fn follows_peer_into_racing_and_arms() {
        let sensors = FinishSensors::new(SensorConfig::default());
        let mut node = FinishNode::new(AckPort::new(), RecordingDisplay::default(), &sensors);
        let mut clock = SimClock::default();
        to_racing(&mut node, &mut clock, RaceMode::GateDrop);
        assert!(sensors.is_armed());
    }

    #[test]
    fn both_lanes_finish_then_winner_is_sent() {
        let sensors = FinishSensors::new(SensorConfig::default());
        let mut node = FinishNode::new(AckPort::new(), RecordingDisplay::default(), &sensors);
        let mut clock = SimClock::default();
        to_racing(&mut node, &mut clock, RaceMode::GateDrop);

        run(&mut node, &mut clock, 1_000);
        sensors.on_edge(Lane::Right, clock.now_us());
        run(&mut node, &mut clock, 100);
        sensors.on_edge(Lane::Left, clock.now_us());
        run(&mut node, &mut clock, 10);

        assert_eq!(node.state(), RaceState::Complete);
        assert!(!sensors.is_armed());
        assert!(node.results().lane(Lane::Right).winner);
        assert!(node
            .port()
            .sent
            .contains(&Message::Winner(WinnerMask(WinnerMask::RIGHT))));
        assert_eq!(node.display().shown.len(), 2);
    }

    #[test]
    fn unfinished_lane_is_forced_at_max() {
        let config = SensorConfig::default().with_max_race_time_us(2_000_000);
        let sensors = FinishSensors::new(config);
        let mut node = FinishNode::new(AckPort::new(), RecordingDisplay::default(), &sensors);
        let mut clock = SimClock::default();
        to_racing(&mut node, &mut clock, RaceMode::GateDrop);

        run(&mut node, &mut clock, 1_000);
        sensors.on_edge(Lane::Left, clock.now_us());
        run(&mut node, &mut clock, 1_100);

        assert_eq!(node.state(), RaceState::Complete);
        assert_eq!(node.results().lane(Lane::Right).race_time_us, 2_000_000);
        assert!(node.results().lane(Lane::Left).winner);
    }

    #[test]
    fn reaction_mode_pages_through_results() {
        let sensors = FinishSensors::new(SensorConfig::default());
        let mut node = FinishNode::new(AckPort::new(), RecordingDisplay::default(), &sensors);
        let mut clock = SimClock::default();
        to_racing(&mut node, &mut clock, RaceMode::Reaction);

        node.port.push_rx(Message::Reaction { lane: Lane::Left, micros: 150_000 });
        node.port.push_rx(Message::Reaction { lane: Lane::Right, micros: 250_000 });
        node.port.push_rx(Message::Foul(FoulMask::default()));
        run(&mut node, &mut clock, 1_000);
        sensors.on_edge(Lane::Left, clock.now_us());
        sensors.on_edge(Lane::Right, clock.now_us());
        run(&mut node, &mut clock, 10);
        assert_eq!(node.state(), RaceState::Complete);

        let left = *node.results().lane(Lane::Left);
        assert_eq!(left.reaction_time_us, 150_000);
        assert_eq!(left.car_time_us, left.race_time_us - 150_000);
        assert!(node.results().lane(Lane::Right).winner);

        node.port.push_rx(Message::DisplayAdvance);
        run(&mut node, &mut clock, 5);
        assert_eq!(node.state(), RaceState::Complete);
        assert_eq!(node.display().shown.last(), Some(&(Lane::Right, 250_000)));

        node.port.push_rx(Message::DisplayAdvance);
        run(&mut node, &mut clock, 5);
        assert_eq!(node.state(), RaceState::Idle);
        assert_eq!(node.display().cleared, 4);
    }

    #[test]
    fn undelivered_winner_holds_off_idle() {
        let sensors = FinishSensors::new(SensorConfig::default());
        let mut node = FinishNode::new(AckPort::new(), RecordingDisplay::default(), &sensors);
        let mut clock = SimClock::default();
        to_racing(&mut node, &mut clock, RaceMode::GateDrop);
        node.port.withhold = Some(MsgId::Winner);

        run(&mut node, &mut clock, 1_000);
        sensors.on_edge(Lane::Left, clock.now_us());
        sensors.on_edge(Lane::Right, clock.now_us());
        run(&mut node, &mut clock, 10);
        assert_eq!(node.state(), RaceState::Complete);

        node.port.push_rx(Message::DisplayAdvance);
        run(&mut node, &mut clock, 20);
        assert_eq!(node.state(), RaceState::Complete);
        assert!(!node.port().sent.contains(&Message::RaceState(RaceState::Idle)));

        node.port.withhold = None;
        run(&mut node, &mut clock, 10);
        assert_eq!(node.state(), RaceState::Idle);
    }

    #[test]
    fn car_ids_are_attached_to_results() {
        let sensors = FinishSensors::new(SensorConfig::default());
        let mut node = FinishNode::new(AckPort::new(), RecordingDisplay::default(), &sensors);
        let mut clock = SimClock::default();
        node.port.push_rx(Message::CarId { lane: Lane::Left, uid: [1, 2, 3, 4] });
        to_racing(&mut node, &mut clock, RaceMode::GateDrop);
        run(&mut node, &mut clock, 600);
        sensors.on_edge(Lane::Left, clock.now_us());
        sensors.on_edge(Lane::Right, clock.now_us());
        run(&mut node, &mut clock, 5);

        assert_eq!(node.results().lane(Lane::Left).car_id, Some([1, 2, 3, 4]));
        assert_eq!(node.results().lane(Lane::Right).car_id, None);
    }
}
