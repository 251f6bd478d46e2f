use crate::*;

#[test]
fn compdb_lists_compile_steps() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write(
        "catalyst.build",
        "DEF|cc|gcc\nDEF|cflags|-O2\ncc|main.c|main.o\nld|main.o|app\n",
    )?;
    space.write("main.c", "")?;

    let out = space.run_expect(&mut catalyst_command(vec!["--compdb"]))?;
    let stdout = std::str::from_utf8(&out.stdout)?;
    assert!(stdout.trim_start().starts_with('['), "got: {}", stdout);
    assert_output_contains(&out, "\"file\": \"main.c\"");
    assert_output_contains(&out, "\"output\": \"main.o\"");
    assert_output_contains(&out, "\"gcc\"");
    assert_output_contains(&out, "\"-O2\"");
    // The link step is not part of a compilation database.
    assert_output_not_contains(&out, "\"output\": \"app\"");
    Ok(())
}

#[test]
fn graph_emits_dot() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write(
        "catalyst.build",
        "DEF|cc|gcc\ncc|main.c|main.o\nld|main.o|app\n",
    )?;
    space.write("main.c", "")?;

    let out = space.run_expect(&mut catalyst_command(vec!["--graph"]))?;
    let stdout = std::str::from_utf8(&out.stdout)?;
    assert!(stdout.starts_with("digraph"), "got: {}", stdout);
    assert_output_contains(&out, "main.c");
    assert_output_contains(&out, "->");
    // Outputs are missing, so producers render stale.
    assert_output_contains(&out, "fillcolor=green");
    assert_output_contains(&out, "fillcolor=lightgrey");
    Ok(())
}

#[test]
fn emit_paths_report_cycles() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("catalyst.build", "cxx|x|y\ncxx|y|x\n")?;
    let out = space.run(&mut catalyst_command(vec!["--graph"]))?;
    assert!(!out.status.success());
    assert_stderr_contains(&out, "cycle detected");
    Ok(())
}
