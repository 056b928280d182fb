//! Interrupt latching, priority and timer 1 on the TMS7000.

use emu_core::{Bus, Cpu, LineState, Observable, ReadResult, SimpleBus, Value};
use ti_tms7000::peripheral::{INT1, INT2, INT3};
use ti_tms7000::{Register, Tms7000, Tms7000Model, flags};

fn boot(program: &[u8]) -> (Tms7000, SimpleBus) {
    let mut bus = SimpleBus::new();
    bus.load(0xF000, program);
    bus.poke_word(0xFFFE, 0xF000);
    bus.poke_word(0xFFFC, 0xF200); // INT1
    bus.poke_word(0xFFFA, 0xF300); // INT2
    bus.poke_word(0xFFF8, 0xF400); // INT3
    let mut cpu = Tms7000::new(Tms7000Model::Tms7040);
    cpu.reset(&mut bus);
    (cpu, bus)
}

/// MOVP %0x15,P0 (enable INT1-3); EINT; NOP...
const ENABLE_ALL: [u8; 8] = [0xA2, 0x15, 0x00, 0x05, 0x00, 0x00, 0x00, 0x00];

#[test]
fn lowest_numbered_interrupt_wins() {
    let (mut cpu, mut bus) = boot(&ENABLE_ALL);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    cpu.set_irq_line(INT3, LineState::Held);
    cpu.set_irq_line(INT1, LineState::Held);
    // Service (19) plus the NOP at the handler (5).
    assert_eq!(cpu.step(&mut bus), 24);
    assert_eq!(cpu.pc(), 0xF201);
    assert_eq!(bus.acknowledged, vec![INT1]);
    assert_eq!(cpu.query("irq.2.latched"), Some(Value::Bool(true)));
    // ST, PC high, PC low on the stack; ST cleared.
    assert_eq!(cpu.sp(), 4);
    assert_eq!(cpu.register(Register::R(2)), 0xF0);
    assert_eq!(cpu.register(Register::R(3)), 0xF0);
    assert_eq!(cpu.register(Register::R(4)), 0x04);
    assert_eq!(cpu.st(), 0);
}

#[test]
fn reti_restores_status_and_pc() {
    let (mut cpu, mut bus) = boot(&ENABLE_ALL);
    bus.load(0xF200, &[0x0B]); // RETI
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    cpu.set_irq_line(INT1, LineState::Held);
    // Service plus RETI in one iteration.
    assert_eq!(cpu.step(&mut bus), 19 + 9);
    assert_eq!(cpu.pc(), 0xF004);
    assert_eq!(cpu.sp(), 1);
    assert_eq!(cpu.st() & flags::I, flags::I);
}

#[test]
fn interrupts_wait_for_global_enable() {
    // MOVP %0x15,P0; NOP; EINT; NOP
    let (mut cpu, mut bus) = boot(&[0xA2, 0x15, 0x00, 0x00, 0x05, 0x00]);
    cpu.step(&mut bus);
    cpu.set_irq_line(INT1, LineState::Held);
    assert_eq!(cpu.step(&mut bus), 5);
    assert_eq!(cpu.pc(), 0xF004);
    assert_eq!(cpu.step(&mut bus), 5);
    assert_eq!(cpu.pc(), 0xF005);
    assert!(bus.acknowledged.is_empty());
    cpu.step(&mut bus);
    assert_eq!(bus.acknowledged, vec![INT1]);
}

#[test]
fn latch_survives_masking_and_shows_in_iocnt0() {
    // EINT (with every line disabled); MOVP P0,A; MOVP %0x02,P0
    let (mut cpu, mut bus) = boot(&[0x05, 0x80, 0x00, 0xA2, 0x02, 0x00]);
    cpu.step(&mut bus);
    cpu.set_irq_line(INT1, LineState::Asserted);
    cpu.set_irq_line(INT1, LineState::Clear);
    cpu.step(&mut bus);
    assert_eq!(cpu.a() & 0x02, 0x02);
    assert!(bus.acknowledged.is_empty());
    cpu.step(&mut bus);
    assert_eq!(cpu.query("irq.0.latched"), Some(Value::Bool(false)));
}

#[test]
fn iocnt0_query_matches_what_the_cpu_reads() {
    // EINT (with every line disabled); MOVP %0x02,P0 (clear INT1); MOVP P0,A
    let (mut cpu, mut bus) = boot(&[0x05, 0xA2, 0x02, 0x00, 0x80, 0x00]);
    cpu.step(&mut bus);
    cpu.set_irq_line(INT1, LineState::Asserted);
    cpu.step(&mut bus);
    assert_eq!(cpu.query("irq.0.latched"), Some(Value::Bool(false)));
    // The latch is gone but the line is still active.
    cpu.step(&mut bus);
    assert_eq!(cpu.a() & 0x02, 0x02);
    assert_eq!(cpu.query("iocnt0"), Some(Value::U8(cpu.a())));
}

#[test]
fn timer1_underflow_raises_int2_and_wakes_idle() {
    let (mut cpu, mut bus) = boot(&[
        0xA2, 0x02, 0x02, // MOVP %2,P2: reload 2
        0xA2, 0x80, 0x03, // MOVP %0x80,P3: start, prescale 0
        0xA2, 0x04, 0x00, // MOVP %0x04,P0: enable INT2
        0x05, // EINT
        0x01, // IDLE
    ]);
    for _ in 0..5 {
        cpu.step(&mut bus);
    }
    assert!(cpu.is_idle());
    assert!(bus.idle);

    let mut steps = 0;
    while cpu.is_idle() && steps < 100 {
        cpu.step(&mut bus);
        steps += 1;
    }
    assert!(!cpu.is_idle());
    assert!(!bus.idle);
    assert_eq!(bus.acknowledged, vec![INT2]);
    assert_eq!(cpu.pc(), 0xF301);
    // Three timer clocks of 16 cycles each from the start write.
    assert!(cpu.total_cycles().get() >= 3 * 16);
}

#[test]
fn idle_consumes_up_to_the_next_tick() {
    let (mut cpu, mut bus) = boot(&[0x01]); // IDLE
    assert_eq!(cpu.step(&mut bus), 6);
    assert_eq!(cpu.step(&mut bus), 10);
    assert_eq!(cpu.step(&mut bus), 16);
    // A run budget cuts the idle quantum short.
    assert_eq!(cpu.run(&mut bus, 3), 3);
}

#[test]
fn int3_edge_captures_timer() {
    // MOVP %0x50,P2; MOVP %0x9F,P3
    let (mut cpu, mut bus) = boot(&[0xA2, 0x50, 0x02, 0xA2, 0x9F, 0x03]);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    cpu.set_irq_line(INT3, LineState::Asserted);
    assert_eq!(cpu.query("timer1.capture"), Some(Value::U8(0x50)));
    assert_eq!(cpu.query("irq.2.latched"), Some(Value::Bool(true)));
}

/// Host timer that holds INT1 on its first peripheral tick.
struct TimerBus {
    inner: SimpleBus,
    ticks: u32,
}

impl Bus for TimerBus {
    fn read(&mut self, address: u32) -> ReadResult {
        self.inner.read(address)
    }

    fn write(&mut self, address: u32, value: u8) -> u8 {
        self.inner.write(address, value)
    }

    fn io_read(&mut self, address: u32) -> ReadResult {
        self.inner.io_read(address)
    }

    fn io_write(&mut self, address: u32, value: u8) -> u8 {
        self.inner.io_write(address, value)
    }

    fn interrupt_ack(&mut self, line: u8) -> u8 {
        self.inner.interrupt_ack(line)
    }

    fn peripheral_tick(&mut self) -> Option<(u8, LineState)> {
        self.ticks += 1;
        (self.ticks == 1).then_some((INT1, LineState::Held))
    }
}

#[test]
fn host_peripheral_tick_is_serviced_on_the_next_iteration() {
    let (mut cpu, inner) = boot(&ENABLE_ALL);
    let mut bus = TimerBus { inner, ticks: 0 };
    // MOVP (11) then EINT (5) reaches the first 16-cycle tick.
    assert_eq!(cpu.step(&mut bus), 11);
    assert_eq!(bus.ticks, 0);
    assert_eq!(cpu.step(&mut bus), 5);
    assert_eq!(bus.ticks, 1);
    assert!(bus.inner.acknowledged.is_empty());
    assert_eq!(cpu.pc(), 0xF004);
    assert_eq!(cpu.step(&mut bus), 19 + 5);
    assert_eq!(bus.inner.acknowledged, vec![INT1]);
    assert_eq!(cpu.pc(), 0xF201);
}
