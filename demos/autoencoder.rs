use laminar::{Autoencoder, Batch, LayerOptions, LayerSpec, Matrix, Target};

fn main() -> laminar::Result<()> {
    // 6 -> 3 -> 6 with the decoder tied to the encoder weights.
    let model = Autoencoder::new(vec![
        LayerSpec::from(6),
        LayerSpec::from((3, "tanh")),
        LayerSpec::from(LayerOptions::default().form("tied")),
    ])?;
    println!("{}", model.describe());

    let x = Matrix::from_data(vec![
        vec![1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
        vec![0.0, 1.0, 0.0, 0.0, 1.0, 0.0],
        vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
    ]);
    let code = model.encode(&x, None)?;
    let back = model.decode(&code, None)?;
    println!("code: {:?}", code.data);
    println!("reconstruction: {:?}", back.data);
    println!("R^2: {:.4}", model.score(&Batch::new(x, Target::None))?);
    Ok(())
}
