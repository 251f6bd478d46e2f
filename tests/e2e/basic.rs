use crate::*;

#[test]
fn empty_manifest() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("catalyst.build", "")?;
    let out = space.run_expect(&mut catalyst_command(vec![]))?;
    assert_eq!(
        std::str::from_utf8(&out.stdout)?,
        "catalyst: no work to do\n"
    );
    Ok(())
}

#[test]
fn missing_manifest_fails() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    let out = space.run(&mut catalyst_command(vec![]))?;
    assert!(!out.status.success());
    assert_stderr_contains(&out, "catalyst.build");
    Ok(())
}

#[cfg(unix)]
#[test]
fn basic_build() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write_tool("faketool", TOUCH_TOOL)?;
    space.write(
        "catalyst.build",
        "DEF|cc|./faketool\ncc|in.c|out.o\n",
    )?;
    space.write("in.c", "int main() {}")?;
    space.sub_mtime("catalyst.build", std::time::Duration::from_secs(5))?;
    space.sub_mtime("in.c", std::time::Duration::from_secs(5))?;

    let out = space.run_expect(&mut catalyst_command(vec![]))?;
    assert_output_contains(&out, "ran 1 task");
    assert!(space.read("out.o").is_ok());

    // Everything is up to date on a second run.
    let out = space.run_expect(&mut catalyst_command(vec![]))?;
    assert_output_contains(&out, "no work to do");

    Ok(())
}

#[cfg(unix)]
#[test]
fn specify_build_file() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write_tool("faketool", TOUCH_TOOL)?;
    space.write("other.build", "DEF|cc|./faketool\ncc|in.c|out.o\n")?;
    space.write("in.c", "")?;
    space.run_expect(&mut catalyst_command(vec!["-f", "other.build"]))?;
    assert!(space.read("out.o").is_ok());
    Ok(())
}

#[cfg(unix)]
#[test]
fn dry_run_prints_but_builds_nothing() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("catalyst.build", "DEF|cc|gcc\ncc|in.c|out.o\n")?;
    space.write("in.c", "")?;

    let out = space.run_expect(&mut catalyst_command(vec!["--dry-run"]))?;
    assert_output_contains(&out, "gcc");
    assert_output_contains(&out, "out.o");
    assert!(space.read("out.o").is_err());
    Ok(())
}

#[test]
fn duplicate_producer_fails() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write(
        "catalyst.build",
        "cc|a.c|out.o\ncc|b.c|out.o\n",
    )?;
    let out = space.run(&mut catalyst_command(vec![]))?;
    assert!(!out.status.success());
    assert_stderr_contains(&out, "duplicate producer for output: out.o");
    Ok(())
}

#[test]
fn unknown_tool_fails() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("catalyst.build", "frobnicate|a.c|out.o\n")?;
    let out = space.run(&mut catalyst_command(vec![]))?;
    assert!(!out.status.success());
    assert_stderr_contains(&out, "unknown tool");
    assert_stderr_contains(&out, "catalyst.build:1");
    Ok(())
}

#[cfg(unix)]
#[test]
fn failing_step_fails_the_build() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("catalyst.build", "DEF|cc|false\ncc|in.c|out.o\n")?;
    space.write("in.c", "")?;

    let out = space.run(&mut catalyst_command(vec![]))?;
    assert!(!out.status.success());
    assert_stderr_contains(&out, "step failed");
    Ok(())
}

#[cfg(unix)]
#[test]
fn opaque_input_rebuilds_but_stays_off_the_command_line() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write_tool("faketool", TOUCH_TOOL)?;
    space.write(
        "catalyst.build",
        "DEF|cc|./faketool\ncc|in.c,!opaque.txt|out.o\n",
    )?;
    space.write("in.c", "")?;
    space.write("opaque.txt", "some data")?;
    for path in ["catalyst.build", "in.c", "opaque.txt"] {
        space.sub_mtime(path, std::time::Duration::from_secs(5))?;
    }

    // Verbose mode prints the full command; the opaque input must not be
    // part of it.
    let out = space.run_expect(&mut catalyst_command(vec!["-v"]))?;
    assert_output_contains(&out, "in.c");
    assert_output_not_contains(&out, "opaque.txt");

    // Touching the opaque input still triggers a rebuild.
    space.write("opaque.txt", "changed data")?;
    let out = space.run_expect(&mut catalyst_command(vec![]))?;
    assert_output_contains(&out, "ran 1 task");
    Ok(())
}

#[cfg(unix)]
#[test]
fn oversize_link_spills_to_response_file() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write_tool("faketool", TOUCH_TOOL)?;
    let inputs: Vec<String> = (0..51).map(|i| format!("obj{}.o", i)).collect();
    space.write(
        "catalyst.build",
        &format!("DEF|cxx|./faketool\nld|{}|app\n", inputs.join(",")),
    )?;
    for input in &inputs {
        space.write(input, "")?;
    }

    space.run_expect(&mut catalyst_command(vec![]))?;
    assert!(space.read("app").is_ok());
    let rsp = space.read("app.rsp")?;
    assert_eq!(std::str::from_utf8(&rsp)?.lines().count(), 51);
    Ok(())
}
