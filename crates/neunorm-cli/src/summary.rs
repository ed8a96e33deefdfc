use std::path::Path;

use console::Style;
use neunorm_core::filters::gamma::GammaFilterParams;
use neunorm_core::io::image_io::ExportOptions;
use neunorm_core::pipeline::config::NormalizationConfig;
use neunorm_core::stack::ImageStack;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
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
            path: Style::new().underlined(),
        }
    }
}

/// The loaded stacks and destination of a normalize run.
pub struct RunInputs<'a> {
    pub sample: &'a ImageStack,
    pub ob: Option<&'a ImageStack>,
    pub df: Option<&'a ImageStack>,
    pub output: &'a Path,
}

pub fn print_normalize_summary(
    inputs: &RunInputs<'_>,
    config: &NormalizationConfig,
    export: &ExportOptions,
) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Neutron Normalization"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(21)));
    println!();

    // Inputs
    println!("  {}", s.header.apply_to("Inputs"));
    print_stack_line(&s, "Sample", Some(inputs.sample));
    print_stack_line(&s, "Open beam", inputs.ob);
    print_stack_line(&s, "Dark field", inputs.df);
    println!();

    // Normalization
    println!("  {}", s.header.apply_to("Normalization"));
    match inputs.ob {
        Some(_) => println!(
            "    {:<14}{}",
            s.label.apply_to("OB reference"),
            s.method.apply_to(config.ob_reduction)
        ),
        None => println!(
            "    {:<14}{}",
            s.label.apply_to("OB reference"),
            s.disabled.apply_to("none, sample ROI only")
        ),
    }
    if inputs.df.is_some() {
        println!(
            "    {:<14}{}",
            s.label.apply_to("DF reference"),
            s.method.apply_to(config.df_reduction)
        );
    }
    if config.use_gamma_filter {
        print_gamma_line(&s, &config.gamma);
    } else {
        println!(
            "    {:<14}{}",
            s.label.apply_to("Gamma filter"),
            s.disabled.apply_to("disabled")
        );
    }
    if config.rois.is_empty() {
        println!(
            "    {:<14}{}",
            s.label.apply_to("ROI"),
            s.disabled.apply_to("none")
        );
    } else {
        for roi in &config.rois {
            println!("    {:<14}{}", s.label.apply_to("ROI"), s.value.apply_to(roi));
        }
    }
    println!();

    // Post-processing
    println!("  {}", s.header.apply_to("Post-processing"));
    match config.crop {
        Some(ref roi) => println!("    {:<14}{}", s.label.apply_to("Crop"), s.value.apply_to(roi)),
        None => println!(
            "    {:<14}{}",
            s.label.apply_to("Crop"),
            s.disabled.apply_to("none")
        ),
    }
    match config.resize {
        Some(ref resize) => println!(
            "    {:<14}{}",
            s.label.apply_to("Resize"),
            s.value.apply_to(resize)
        ),
        None => println!(
            "    {:<14}{}",
            s.label.apply_to("Resize"),
            s.disabled.apply_to("none")
        ),
    }
    println!();

    // Output
    println!(
        "  {:<16}{}",
        s.label.apply_to("Output"),
        s.path.apply_to(inputs.output.display())
    );
    println!(
        "  {:<16}{}",
        s.label.apply_to("Format"),
        s.method.apply_to(format!("{:?}", export.format))
    );
    println!();
}

fn print_stack_line(s: &Styles, label: &str, stack: Option<&ImageStack>) {
    match stack.and_then(|st| st.shape().map(|shape| (st.len(), shape))) {
        Some((count, (h, w))) => println!(
            "    {:<14}{}",
            s.label.apply_to(label),
            s.value.apply_to(format!("{count} frame(s), {w}x{h}"))
        ),
        None => println!(
            "    {:<14}{}",
            s.label.apply_to(label),
            s.disabled.apply_to("none")
        ),
    }
}

fn print_gamma_line(s: &Styles, params: &GammaFilterParams) {
    println!(
        "    {:<14}{}",
        s.label.apply_to("Gamma filter"),
        s.method.apply_to(format!("{}, radius {}", params.rule, params.radius))
    );
}
