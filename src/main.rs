use anyhow::Result;
use tmm::settings;
use tmm::{output, spectrum::Spectrum};

fn main() -> Result<()> {
    let settings = settings::load_config()?;
    println!("{}", settings);

    let wavelengths = settings.wavelengths()?;
    let spectrum = Spectrum::sweep(&settings.stack, &wavelengths, Some(settings.incident_field))?;

    println!("{}", output::format_table(&spectrum));

    if let Some(path) = &settings.output {
        output::write_json(path, &spectrum)?;
        println!("Results written to {}", path);
    }

    Ok(())
}
