use clap::CommandFactory;

#[allow(dead_code)]
#[path = "src/bin/sepolq/args.rs"]
mod sepolq;

fn main() -> std::io::Result<()> {
    // Generate man page
    // https://rust-cli.github.io/book/in-depth/docs.html
    let out_dir =
        std::path::PathBuf::from(std::env::var_os("OUT_DIR").ok_or(std::io::ErrorKind::NotFound)?);
    let cmd = sepolq::Args::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buffer: Vec<u8> = Default::default();
    man.render(&mut buffer)?;

    std::fs::write(out_dir.join("sepolq.1"), buffer)?;

    Ok(())
}
