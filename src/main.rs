use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use certdocx::{
    Catalog, Error, FieldPlacement, Template, TemplateDescriptor, TemplateKind,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Generate one merged certificate document from spreadsheet rows")]
struct Args {
    /// Spreadsheet (.xlsx or .xls), first row = column headers
    #[arg(short, long)]
    sheet: PathBuf,

    /// Template catalog directory (holds index.json)
    #[arg(long, requires = "template_id", conflicts_with_all = ["docx", "image"])]
    catalog: Option<PathBuf>,

    /// Template id within the catalog
    #[arg(short, long, requires = "catalog")]
    template_id: Option<String>,

    /// Word template with {field} placeholders
    #[arg(long, conflicts_with = "image")]
    docx: Option<PathBuf>,

    /// Background image for an overlay template
    #[arg(long, requires = "layout")]
    image: Option<PathBuf>,

    /// JSON array of field placements for --image
    #[arg(long, requires = "image")]
    layout: Option<PathBuf>,

    /// Output .docx file
    #[arg(short, long, default_value = "certificates.docx")]
    output: PathBuf,
}

fn template_from_args(args: &Args) -> Result<Template, Error> {
    if let (Some(dir), Some(id)) = (&args.catalog, &args.template_id) {
        let catalog = Catalog::load(dir)?;
        let descriptor = catalog.get(id)?;
        return Template::load(descriptor, &catalog.template_path(descriptor));
    }
    if let Some(docx) = &args.docx {
        return Template::load(&descriptor(TemplateKind::Substitution, docx, Vec::new()), docx);
    }
    if let (Some(image), Some(layout)) = (&args.image, &args.layout) {
        let text = std::fs::read_to_string(layout)?;
        let fields: Vec<FieldPlacement> = serde_json::from_str(&text)
            .map_err(|e| Error::Catalog(format!("{}: {e}", layout.display())))?;
        return Template::load(&descriptor(TemplateKind::Overlay, image, fields), image);
    }
    Err(Error::Catalog(
        "pass --catalog with --template-id, --docx, or --image with --layout".into(),
    ))
}

fn descriptor(kind: TemplateKind, path: &Path, fields: Vec<FieldPlacement>) -> TemplateDescriptor {
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    TemplateDescriptor {
        id: name.clone(),
        name,
        kind,
        path: path.to_path_buf(),
        fields,
    }
}

fn run(args: &Args) -> Result<usize, Error> {
    let template = template_from_args(args)?;
    let sheet = std::fs::read(&args.sheet)?;
    let generated = certdocx::generate(&sheet, &template)?;
    std::fs::write(&args.output, &generated.bytes)?;
    Ok(generated.record_count)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match run(&args) {
        Ok(count) => println!("{count} certificates written to {}", args.output.display()),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
