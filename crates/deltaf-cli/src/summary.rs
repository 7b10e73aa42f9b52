use console::Style;
use deltaf_core::io::source::SeriesSource;
use deltaf_core::pipeline::config::PipelineConfig;
use deltaf_core::pipeline::PipelineOutput;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    warning: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            warning: Style::new().yellow(),
            path: Style::new().underlined(),
        }
    }
}

pub fn print_pipeline_summary(config: &PipelineConfig) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("dF/F Analysis"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(13)));
    println!();

    match &config.source {
        SeriesSource::Table { path, options } => {
            println!(
                "  {:<14}{}",
                s.label.apply_to("Table"),
                s.path.apply_to(path.display())
            );
            println!(
                "  {:<14}{}",
                s.label.apply_to("First column"),
                s.value.apply_to(options.first_column)
            );
        }
        SeriesSource::Stack(stack) => {
            println!(
                "  {:<14}{}",
                s.label.apply_to("Stack"),
                s.path.apply_to(stack.folder.display())
            );
            let channel = match &stack.ratio_to {
                Some(reference) => format!("{} / {}", stack.channel, reference),
                None => stack.channel.clone(),
            };
            println!(
                "  {:<14}{}",
                s.label.apply_to("Channel"),
                s.value.apply_to(channel)
            );
            println!(
                "  {:<14}{}",
                s.label.apply_to("ROIs"),
                s.value.apply_to(stack.rois.len())
            );
        }
    }
    println!(
        "  {:<14}{}",
        s.label.apply_to("Time"),
        s.value
            .apply_to(format!("{} ({})", config.timing.source, config.timing.unit))
    );
    if let Some(factor) = config.bin {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Binning"),
            s.value.apply_to(format!("{factor} frames"))
        );
    }
    println!();

    println!("  {}", s.header.apply_to("Normalization"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Baseline"),
        s.value.apply_to(&config.baseline)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Method"),
        s.method.apply_to(config.delta.method)
    );
    if let Some(reference) = config.delta.reference {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Reference"),
            s.value.apply_to(format!("channel {reference}"))
        );
    }
    match &config.response {
        Some(window) => println!(
            "    {:<12}{}",
            s.label.apply_to("Response"),
            s.value.apply_to(window)
        ),
        None => println!(
            "    {:<12}{}",
            s.label.apply_to("Response"),
            s.disabled.apply_to("none")
        ),
    }
    println!();

    println!("  {}", s.header.apply_to("Grouping"));
    match &config.grouping {
        Some(grouping) => println!(
            "    {:<12}{}",
            s.label.apply_to("Rule"),
            s.method.apply_to(grouping)
        ),
        None => println!(
            "    {:<12}{}",
            s.label.apply_to("Rule"),
            s.disabled.apply_to("disabled")
        ),
    }
    println!();
}

pub fn print_output_summary(output: &PipelineOutput) {
    let s = Styles::new();

    println!("  {}", s.header.apply_to("Result"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Frames"),
        s.value.apply_to(output.series.n_frames())
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Channels"),
        s.value.apply_to(output.series.n_channels())
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Baseline"),
        s.value.apply_to(format!(
            "{} ({} samples)",
            output.baseline,
            output.delta.baseline_range.len()
        ))
    );
    if let Some(groups) = &output.groups {
        let names: Vec<String> = groups
            .iter()
            .map(|(key, stats)| format!("{key} (n={})", stats.members.len()))
            .collect();
        println!(
            "    {:<12}{}",
            s.label.apply_to("Groups"),
            s.value.apply_to(names.join(", "))
        );
    }
    for warning in output.warnings() {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Warning"),
            s.warning.apply_to(warning)
        );
    }
    for path in &output.written {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Wrote"),
            s.path.apply_to(path.display())
        );
    }
    println!();
}
