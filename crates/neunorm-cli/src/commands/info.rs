use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use super::load_inputs;

#[derive(Args)]
pub struct InfoArgs {
    /// Image files or folders
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let stack = load_inputs(&args.paths, "input")?;
    let Some((height, width)) = stack.shape() else {
        println!("No frames found");
        return Ok(());
    };

    let frames = stack.frames();
    println!("Frames:      {}", stack.len());
    println!("Dimensions:  {}x{}", width, height);
    println!("First:       {}", frames[0].metadata.source);
    println!("Last:        {}", frames[frames.len() - 1].metadata.source);
    match frames[0].metadata.saturation {
        Some(max) => println!("Saturation:  {max}"),
        None => println!("Saturation:  n/a (float data)"),
    }

    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    let mut sum = 0.0f64;
    for &v in stack.iter().flat_map(|f| f.data.iter()) {
        min = min.min(v);
        max = max.max(v);
        sum += v as f64;
    }
    let count = stack.len() * width * height;
    println!("Min:         {min}");
    println!("Max:         {max}");
    println!("Mean:        {:.3}", sum / count as f64);

    let total_mb = (count * std::mem::size_of::<f32>()) as f64 / (1024.0 * 1024.0);
    println!("Memory:      {:.1} MB", total_mb);

    Ok(())
}
