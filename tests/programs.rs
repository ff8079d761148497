use lc3_sim::asm::{assemble, ObjectFile};
use lc3_sim::ast::reg_consts::{R0, R1, R2};
use lc3_sim::parse::parse_ast;
use lc3_sim::sim::io::BufferedConsole;
use lc3_sim::sim::{SimErr, SimFlags, Simulator};

fn assemble_src(src: &str) -> ObjectFile {
    assemble(parse_ast(src).unwrap()).unwrap()
}

fn load(obj: &ObjectFile, input: &str) -> (Simulator, BufferedConsole) {
    let console = BufferedConsole::with_input(input);
    let mut sim = Simulator::new(SimFlags::default());
    sim.set_console(console.clone());
    sim.load_obj_file(obj);
    (sim, console)
}

#[test]
fn multiply_loop() {
    let obj = assemble_src("
        .orig x3000
        LD R1, A
        LD R2, B
        AND R0, R0, #0
    LOOP ADD R0, R0, R1
        ADD R2, R2, #-1
        BRp LOOP
        ST R0, RESULT
        HALT
    A .fill #6
    B .fill #7
    RESULT .blkw 1
        .end
    ");
    let (mut sim, console) = load(&obj, "");
    sim.run().unwrap();

    assert!(sim.hit_halt());
    assert_eq!(sim.reg_file[R0], 42);
    assert_eq!(sim.reg_file[R2], 0);
    assert_eq!(sim.read_mem(0x300A).unwrap(), 42);
    assert_eq!(console.output_string(), "");
}

#[test]
fn echo_upper_case() {
    // reads characters until a newline, printing each one upper-cased
    let obj = assemble_src(r#"
        .orig x3000
        LEA R0, PROMPT
        PUTS
    NEXT GETC
        LD R1, NEG_NL
        ADD R1, R0, R1
        BRz DONE
        LD R1, NEG_A
        ADD R1, R0, R1
        BRn PRINT
        LD R1, TO_UPPER
        ADD R0, R0, R1
    PRINT OUT
        BR NEXT
    DONE HALT
    NEG_NL .fill #-10
    NEG_A .fill #-97
    TO_UPPER .fill #-32
    PROMPT .stringz "say: "
        .end
    "#);
    let (mut sim, console) = load(&obj, "hi 2u\n");
    sim.run().unwrap();

    assert!(sim.hit_halt());
    assert_eq!(console.output_string(), "say: HI 2U\n");
}

#[test]
fn in_then_puts() {
    let obj = assemble_src(r#"
        .orig x3000
        IN
        ST R0, SLOT
        LEA R0, SLOT
        PUTS
        HALT
    SLOT .fill #0
        .fill #0
        .end
    "#);
    let (mut sim, console) = load(&obj, "k");
    sim.run().unwrap();

    assert_eq!(console.output_string(), "Input a character> k\nk\n");
}

#[test]
fn runaway_program_is_stopped() {
    let obj = assemble_src("
        .orig x3000
        ADD R0, R0, #1
        ADD R0, R0, #1
        .end
    ");
    let (mut sim, _) = load(&obj, "");
    assert!(matches!(sim.run(), Err(SimErr::AddressTooHigh(0x3002))));
    assert_eq!(sim.reg_file[R0], 2);
    assert_eq!(sim.instructions_run, 2);

    // stopping is final until the next load
    sim.run().unwrap();
    assert_eq!(sim.instructions_run, 2);
    sim.load_obj_file(&obj);
    assert_eq!(sim.reg_file[R0], 0);
    sim.step_in().unwrap();
    assert_eq!(sim.reg_file[R0], 1);
}

#[test]
fn reload_from_disk() {
    let obj = assemble_src("
        .orig x4000
        LEA R1, DATA
        LDR R0, R1, #0
        HALT
    DATA .fill xBEEF
        .end
    ");
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prog.obj");
    obj.write_to(std::fs::File::create(&path).unwrap()).unwrap();

    let mut sim = Simulator::new(SimFlags::default());
    sim.set_console(BufferedConsole::new());
    sim.load_obj_path(&path).unwrap();
    sim.run().unwrap();

    assert_eq!(sim.reg_file[R0], 0xBEEF);
    assert_eq!(sim.reg_file[R1], 0x4003);
    assert_eq!(sim.cc(), 0b100);

    std::fs::write(&path, [0x40, 0x00]).unwrap();
    assert!(matches!(sim.load_obj_path(&path), Err(SimErr::FileTooShort)));
}
