// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Start node: gates, light tree, RFID readers and the operator buttons.
//!
//! The Start node originates Idle -> Staging -> Countdown -> Racing and every mode change. Racing ->
//! Complete and Complete -> Idle come from the Finish node and are applied from the mailbox once
//! this node has nothing left to say about the race.

use crate::config::CountdownConfig;
use crate::error::ErrorCode;
use crate::link::{Inbox, Outbox, TxStatus};
use crate::node::{Now, Port};
use crate::peripherals::lights::{LIGHT_BL, LIGHT_BR, LIGHT_OFF};
use crate::peripherals::{
    winner_cue, Button, ButtonEdge, Buttons, Gates, Lights, RfidForwarder, TagReader,
};
use crate::protocol::{FoulMask, Message, MsgId, StartMask};
use crate::race::{
    light_config, mode_cue, next_mode, reaction_time_us, Announce, Countdown, CountdownState,
    Lane, Lanes, RaceMode, RaceState, RaceTimingData, StateMachine, Step,
};
use crate::time::Clock;

/// Outbound race messages that can be queued at once: two car ids, two reactions, the foul mask,
/// display advances and error reports.
const OUTBOX_LEN: usize = 8;

/// Start node peripherals.
pub struct StartIo<L, G, B, R> {
    pub lights: L,
    pub gates: G,
    pub buttons: B,
    pub tags: R,
}

/// Edges seen this tick.
#[derive(Copy, Clone, Default)]
struct Presses {
    start: bool,
    mode: bool,
}

pub struct StartNode<P, L, G, B, R> {
    port: P,
    io: StartIo<L, G, B, R>,
    state: StateMachine<RaceState>,
    mode: StateMachine<RaceMode>,
    mailbox: Inbox,
    outbox: Outbox<OUTBOX_LEN>,
    countdown: Countdown,
    timing: RaceTimingData,
    fouls: Lanes<bool>,
    reactions: Lanes<Option<u32>>,
    report_queued: bool,
    start_pending: bool,
    rfid: RfidForwarder,
    start_button: ButtonEdge,
    mode_button: ButtonEdge,
}

impl<P, L, G, B, R> StartNode<P, L, G, B, R>
where
    P: Port,
    L: Lights,
    G: Gates,
    B: Buttons,
    R: TagReader,
{
    pub fn new(port: P, io: StartIo<L, G, B, R>, countdown: CountdownConfig) -> Self {
        let mut mode = StateMachine::new(RaceMode::GateDrop);
        // No confirmation cue for the boot mode.
        mode.take_entry();

        Self {
            port,
            io,
            state: StateMachine::new(RaceState::Idle),
            mode,
            mailbox: Inbox::new(),
            outbox: Outbox::new(),
            countdown: Countdown::new(countdown),
            timing: RaceTimingData::new(),
            fouls: Lanes::splat(false),
            reactions: Lanes::splat(None),
            report_queued: false,
            start_pending: false,
            rfid: RfidForwarder::new(),
            start_button: ButtonEdge::new(),
            mode_button: ButtonEdge::new(),
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
    pub fn countdown_state(&self) -> CountdownState {
        self.countdown.state()
    }

    #[inline]
    pub fn fouls(&self) -> FoulMask {
        FoulMask::from_flags(self.fouls.left, self.fouls.right)
    }

    /// Reaction time computed for `lane` this race.
    #[inline]
    pub fn reaction_us(&self, lane: Lane) -> Option<u32> {
        *self.reactions.get(lane)
    }

    #[inline]
    pub fn timing(&self) -> &RaceTimingData {
        &self.timing
    }

    #[inline]
    pub fn port(&self) -> &P {
        &self.port
    }

    #[inline]
    pub fn io(&self) -> &StartIo<L, G, B, R> {
        &self.io
    }

    #[inline]
    pub fn io_mut(&mut self) -> &mut StartIo<L, G, B, R> {
        &mut self.io
    }

    /// Run one pass of the control loop.
    pub fn tick<C: Clock>(&mut self, clock: &C) {
        let now = Now::sample(clock);

        let rx = self.port.poll();
        self.mailbox.merge(rx);
        self.io.lights.tick(now.ms);
        self.io.gates.tick(now.ms);

        if let Some(step) = self.state.poll(&mut self.port, now.ms) {
            self.note_step::<RaceState>(step);
        }
        if let Some(step) = self.mode.poll(&mut self.port, now.ms) {
            self.note_step::<RaceMode>(step);
        }

        if let Some(prev) = self.state.take_exit() {
            debug!("start: exit {}", prev);
        }
        if self.state.take_entry() {
            self.enter(now);
        }
        if self.mode.take_entry() {
            info!("start: mode {}", self.mode.current());
            self.io.lights.start_blink(mode_cue(self.mode.current()), now.ms);
        }

        let presses = Presses {
            start: self.start_button.update(self.io.buttons.is_pressed(Button::Start)),
            mode: self.mode_button.update(self.io.buttons.is_pressed(Button::Mode)),
        };

        match self.state.current() {
            RaceState::Idle => self.idle(presses, now),
            RaceState::Staging => self.staging(presses, now),
            RaceState::Countdown => self.countdown(now),
            RaceState::Racing => self.racing(now),
            RaceState::Complete => self.complete(presses, now),
            RaceState::Test => self.test(now),
        }

        if let Some((msg, status)) = self.outbox.poll(&mut self.port, now.ms) {
            if status != TxStatus::Acked {
                warn!("start: {} not delivered: {}", msg.id(), status);
            }
        }
    }

    fn enter(&mut self, now: Now) {
        let state = self.state.current();
        info!("start: enter {}", state);

        match state {
            RaceState::Idle => {
                self.io.lights.cancel_blink();
                self.io.lights.set_pattern(LIGHT_OFF);
                self.io.gates.drop_gate(Lane::Left);
                self.io.gates.drop_gate(Lane::Right);
            }
            RaceState::Staging => {
                self.io.lights.cancel_blink();
                self.io.gates.return_all(now.ms);
                self.io.lights.set_pattern(LIGHT_BL | LIGHT_BR);
                self.rfid.reset();
            }
            RaceState::Countdown => {
                self.countdown.start(now.ms);
                self.timing = RaceTimingData::new();
                self.fouls = Lanes::splat(false);
                self.start_pending = false;
                self.port.reset(MsgId::RaceStart);
                self.io.lights.set_pattern(light_config(
                    CountdownState::Staged,
                    self.fouls(),
                    self.mode.current(),
                ));
            }
            RaceState::Racing => {
                self.reactions = Lanes::splat(None);
                self.report_queued = false;
                self.mailbox.winner = None;
            }
            RaceState::Complete => {
                self.io.lights.cancel_blink();
            }
            RaceState::Test => {}
        }

        self.start_button.sync(self.io.buttons.is_pressed(Button::Start));
        self.mode_button.sync(self.io.buttons.is_pressed(Button::Mode));
    }

    fn idle(&mut self, presses: Presses, now: Now) {
        if !self.io.lights.is_blinking() {
            if presses.mode && !self.mode.in_flight() {
                let next = next_mode(self.mode.current());
                let step = self.mode.self_transition(next, &mut self.port, now.ms);
                self.note_step::<RaceMode>(step);
            }
            if let Some(mode) = self.mailbox.mode.take() {
                let step = self.mode.rx_transition(mode, &mut self.port);
                self.note_step::<RaceMode>(step);
            }
            if presses.start {
                self.request(RaceState::Staging, now);
            }
        }
        self.accept_peer_state();
    }

    fn staging(&mut self, presses: Presses, now: Now) {
        for lane in Lane::ALL {
            if let Some(uid) = self.rfid.poll(&mut self.io.tags, lane, now.ms) {
                info!("start: car {} on {}", uid, lane);
                self.queue(Message::CarId { lane, uid });
            }
        }

        // Staging only moves forward; the mode button is ignored here.
        if !self.io.lights.is_blinking() && presses.start {
            self.request(RaceState::Countdown, now);
        }
        self.accept_peer_state();
    }

    fn countdown(&mut self, now: Now) {
        let mode = self.mode.current();
        if let Some(stage) = self.countdown.tick(mode, now.ms) {
            if stage == CountdownState::Go {
                self.go(now);
            }
            self.io.lights.set_pattern(light_config(stage, self.fouls(), mode));
        }

        self.poll_triggers(now);
        // Race start goes on the wire ahead of the state change.
        self.drive_race_start(now.ms);
        if self.countdown.is_go() {
            self.request(RaceState::Racing, now);
        }
        self.accept_peer_state();
    }

    fn go(&mut self, now: Now) {
        info!("start: go at {}", now.us);
        self.timing.race_start_us = now.us;
        self.start_pending = true;
        self.port.reset(MsgId::RaceStart);

        if !self.mode.current().uses_triggers() {
            for lane in Lane::ALL {
                self.timing.record(lane, now.us);
                self.io.gates.drop_gate(lane);
            }
        }
    }

    /// Driver triggers release their own gate. Before Go that is a foul.
    fn poll_triggers(&mut self, now: Now) {
        let mode = self.mode.current();
        if !mode.uses_triggers() {
            return;
        }

        let go = self.countdown.is_go();
        let mut fouled = false;
        for lane in Lane::ALL {
            if !self.io.gates.is_up(lane) || !self.io.buttons.is_pressed(Button::trigger(lane)) {
                continue;
            }
            self.io.gates.drop_gate(lane);
            self.timing.record(lane, now.us);
            if !go {
                warn!("start: {} fouled", lane);
                *self.fouls.get_mut(lane) = true;
                fouled = true;
            }
        }

        if fouled {
            let lights = light_config(self.countdown.state(), self.fouls(), mode);
            self.io.lights.set_pattern(lights);
        }
    }

    fn drive_race_start(&mut self, now_ms: u32) {
        if !self.start_pending {
            return;
        }
        match self.port.send(&Message::RaceStart(StartMask::race()), now_ms) {
            TxStatus::Acked => {
                self.port.reset(MsgId::RaceStart);
                self.start_pending = false;
            }
            TxStatus::Timeout | TxStatus::Failed => {
                self.port.reset(MsgId::RaceStart);
                self.start_pending = false;
                self.raise(ErrorCode::StartTxTimeout);
            }
            TxStatus::None | TxStatus::Sent | TxStatus::Nacked => {}
        }
    }

    fn racing(&mut self, now: Now) {
        self.drive_race_start(now.ms);
        self.poll_triggers(now);

        if self.mode.current().uses_triggers() {
            for lane in Lane::ALL {
                if self.timing.is_recorded(lane) && self.reactions.get(lane).is_none() {
                    let reaction = reaction_time_us(
                        self.timing.race_start_us,
                        self.timing.lane_us(lane),
                        *self.fouls.get(lane),
                    );
                    info!("start: {} reaction {} us", lane, reaction);
                    *self.reactions.get_mut(lane) = Some(reaction);
                }
            }
        }

        // Report once both cars are away, or once the peer has already closed the race.
        let both_away = !self.io.gates.is_up(Lane::Left) && !self.io.gates.is_up(Lane::Right);
        if !self.report_queued && (both_away || self.mailbox.state.is_some()) {
            self.queue_race_report();
        }

        if self.report_queued && self.outbox.is_idle() && !self.start_pending {
            self.accept_peer_state();
        }
    }

    fn queue_race_report(&mut self) {
        for lane in Lane::ALL {
            if let Some(reaction) = *self.reactions.get(lane) {
                let micros = i32::try_from(reaction).unwrap_or(i32::MAX);
                self.queue(Message::Reaction { lane, micros });
            }
        }
        self.queue(Message::Foul(self.fouls()));
        self.report_queued = true;
    }

    fn complete(&mut self, presses: Presses, now: Now) {
        if let Some(mask) = self.mailbox.winner.take() {
            if let Some(cue) = winner_cue(mask) {
                self.io.lights.start_blink(cue, now.ms);
            }
        }
        if presses.start {
            self.queue(Message::DisplayAdvance);
        }
        if !self.io.lights.is_blinking() && self.outbox.is_idle() {
            self.accept_peer_state();
        }
    }

    fn test(&mut self, now: Now) {
        self.request(RaceState::Idle, now);
        self.accept_peer_state();
    }

    fn request(&mut self, next: RaceState, now: Now) {
        if self.state.in_flight() {
            return;
        }
        let step = self.state.self_transition(next, &mut self.port, now.ms);
        if step == Step::Rejected {
            debug!("start: {} -> {} rejected", self.state.current(), next);
        }
        self.note_step::<RaceState>(step);
    }

    fn accept_peer_state(&mut self) {
        if let Some(next) = self.mailbox.state.take() {
            let step = self.state.rx_transition(next, &mut self.port);
            self.note_step::<RaceState>(step);
        }
    }

    fn note_step<S: Announce>(&mut self, step: Step) {
        match step {
            Step::Abandoned => self.raise(S::TIMEOUT_CODE),
            Step::Overridden => self.raise(ErrorCode::StateMismatch),
            _ => {}
        }
    }

    fn queue(&mut self, msg: Message) {
        if self.outbox.push(msg).is_err() {
            warn!("start: outbox full, dropped {}", msg.id());
        }
    }

    /// Record an error locally and report it to the peer.
    fn raise(&mut self, code: ErrorCode) {
        self.port.record(code);
        self.queue(Message::Error(code));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peripherals::lights::{LIGHT_FL, LIGHT_Y3};
    use crate::peripherals::{GateBank, TagPoll, TreeLights};
    use crate::protocol::WinnerMask;
    use crate::test_support::{AckPort, MockButtons, MockPin, MockTags, RecordingOutput, SimClock};

    type Node = StartNode<
        AckPort,
        TreeLights<RecordingOutput>,
        GateBank<MockPin, MockPin, MockPin>,
        MockButtons,
        MockTags,
    >;

    fn node() -> Node {
        let io = StartIo {
            lights: TreeLights::new(RecordingOutput::default()),
            gates: GateBank::new(MockPin::default(), MockPin::default(), MockPin::default()),
            buttons: MockButtons::default(),
            tags: MockTags::default(),
        };
        StartNode::new(AckPort::new(), io, CountdownConfig::default())
    }

    /// Tick every millisecond for `ms` milliseconds.
    fn run(node: &mut Node, clock: &mut SimClock, ms: u32) {
        let until = clock.ms + ms;
        while clock.ms < until {
            node.tick(clock);
            clock.advance_ms(1);
        }
    }

    fn press(node: &mut Node, clock: &mut SimClock, button: Button) {
        node.io_mut().buttons.set(button, true);
        run(node, clock, 5);
        node.io_mut().buttons.set(button, false);
        run(node, clock, 5);
    }

    fn to_countdown(node: &mut Node, clock: &mut SimClock) {
        run(node, clock, 10);
        press(node, clock, Button::Start);
        assert_eq!(node.state(), RaceState::Staging);
        press(node, clock, Button::Start);
        assert_eq!(node.state(), RaceState::Countdown);
    }

    #[test]
    fn start_button_walks_to_countdown() {
        let mut node = node();
        let mut clock = SimClock::default();
        to_countdown(&mut node, &mut clock);
        assert!(node.io().gates.is_up(Lane::Left));
        assert!(node
            .port()
            .sent
            .contains(&Message::RaceState(RaceState::Staging)));
    }

    #[test]
    fn held_start_does_not_skip_staging() {
        let mut node = node();
        let mut clock = SimClock::default();
        run(&mut node, &mut clock, 10);
        node.io_mut().buttons.set(Button::Start, true);
        run(&mut node, &mut clock, 200);
        assert_eq!(node.state(), RaceState::Staging);
    }

    #[test]
    fn gate_drop_go_drops_both_gates_and_sends_start() {
        let mut node = node();
        let mut clock = SimClock::default();
        to_countdown(&mut node, &mut clock);
        run(&mut node, &mut clock, 1_600);

        assert_eq!(node.countdown_state(), CountdownState::Go);
        assert_eq!(node.state(), RaceState::Racing);
        assert!(!node.io().gates.is_up(Lane::Left));
        assert!(!node.io().gates.is_up(Lane::Right));
        let sent = &node.port().sent;
        assert!(sent.contains(&Message::RaceStart(StartMask::race())));
        assert!(sent.contains(&Message::Foul(FoulMask::default())));
        assert!(!sent.iter().any(|m| matches!(m, Message::Reaction { .. })));
    }

    #[test]
    fn early_trigger_is_a_foul_with_red_overlay() {
        let mut node = node();
        let mut clock = SimClock::default();
        // Idle entry resyncs the button edges on the first tick.
        run(&mut node, &mut clock, 10);
        press(&mut node, &mut clock, Button::Mode);
        run(&mut node, &mut clock, 2_000);
        assert_eq!(node.mode(), RaceMode::Reaction);

        to_countdown(&mut node, &mut clock);
        run(&mut node, &mut clock, 100);
        node.io_mut().buttons.set(Button::LeftTrigger, true);
        run(&mut node, &mut clock, 5);

        assert!(node.fouls().is_fouled(Lane::Left));
        assert!(!node.io().gates.is_up(Lane::Left));
        assert_eq!(node.io().lights.pattern(), LIGHT_BL | LIGHT_BR | LIGHT_Y3 | LIGHT_FL);

        run(&mut node, &mut clock, 1_500);
        assert_eq!(node.state(), RaceState::Racing);
        node.io_mut().buttons.set(Button::RightTrigger, true);
        run(&mut node, &mut clock, 200);

        let left = node.reaction_us(Lane::Left).unwrap();
        let right = node.reaction_us(Lane::Right).unwrap();
        assert!(left > 1_000_000, "foul reaction is the head start: {}", left);
        assert!(right < 200_000);
        assert!(node.port().sent.contains(&Message::Foul(FoulMask::from_flags(true, false))));
    }

    #[test]
    fn winner_blinks_then_peer_idle_applies() {
        let mut node = node();
        let mut clock = SimClock::default();
        to_countdown(&mut node, &mut clock);
        run(&mut node, &mut clock, 1_600);

        node.port.push_rx(Message::RaceState(RaceState::Complete));
        run(&mut node, &mut clock, 20);
        assert_eq!(node.state(), RaceState::Complete);

        node.port.push_rx(Message::Winner(WinnerMask(WinnerMask::RIGHT)));
        node.port.push_rx(Message::RaceState(RaceState::Idle));
        run(&mut node, &mut clock, 20);
        assert!(node.io().lights.is_blinking());
        assert_eq!(node.state(), RaceState::Complete);

        run(&mut node, &mut clock, 2_000);
        assert_eq!(node.state(), RaceState::Idle);
        assert_eq!(node.io().lights.pattern(), LIGHT_OFF);
    }

    #[test]
    fn mode_button_is_ignored_while_staging() {
        let mut node = node();
        let mut clock = SimClock::default();
        run(&mut node, &mut clock, 10);
        press(&mut node, &mut clock, Button::Start);
        press(&mut node, &mut clock, Button::Mode);
        run(&mut node, &mut clock, 100);

        assert_eq!(node.state(), RaceState::Staging);
        assert_eq!(node.mode(), RaceMode::GateDrop);
        assert!(!node.port().sent.contains(&Message::RaceState(RaceState::Idle)));
        assert!(!node.port().sent.iter().any(|m| matches!(m, Message::RaceMode(_))));
    }

    #[test]
    fn staging_forwards_car_ids_once() {
        let mut node = node();
        let mut clock = SimClock::default();
        run(&mut node, &mut clock, 10);
        node.io_mut().tags.left = TagPoll::NewUid([1, 2, 3, 4]);
        press(&mut node, &mut clock, Button::Start);
        run(&mut node, &mut clock, 2_000);

        let ids = node
            .port()
            .sent
            .iter()
            .filter(|m| matches!(m, Message::CarId { .. }))
            .count();
        assert_eq!(ids, 1);
    }

    #[test]
    fn abandoned_transition_is_reported() {
        let mut node = node();
        let mut clock = SimClock::default();
        node.port.drop_acks = true;
        run(&mut node, &mut clock, 10);
        press(&mut node, &mut clock, Button::Start);
        run(&mut node, &mut clock, 100);

        assert_eq!(node.state(), RaceState::Idle);
        assert_eq!(node.port().recorded, [ErrorCode::StateTxTimeout]);
    }
}
