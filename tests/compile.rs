use std::fs;
use std::path::PathBuf;

use shaderland::compile::ShaderCompiler;
use shaderland::pack::ShaderPack;
use shaderland::pipeline::{Error, Pipeline};
use shaderland::segment::{SegmentError, SegmentOptions};
use shaderland::shader::{ShaderStage, StageSet};
use shaderland::validate::ValidateError;

const SPIRV_MAGIC: u32 = 0x0723_0203;

const GRAPHICS: &str = "\
#shader vertex
void main() {
    gl_Position = vec4(0.0, 0.0, 0.0, 1.0);
}
#shader fragment
layout(location = 0) out vec4 color;
void main() {
    color = vec4(1.0);
}
";

const COMPUTE: &str = "\
#shader compute
layout(local_size_x = 1) in;
void main() {}
";

fn pipeline(compiler: &ShaderCompiler) -> Pipeline<'_> {
    Pipeline::new(compiler, SegmentOptions::default(), Vec::new())
}

#[test]
fn graphics_document_compiles_both_stages() {
    let compiler = ShaderCompiler::new().unwrap();

    let document = pipeline(&compiler)
        .process_source(PathBuf::from("graphics.shader"), GRAPHICS.to_owned())
        .unwrap();

    assert_eq!(document.stages(), StageSet::VERTEX | StageSet::FRAGMENT);

    for (_, slot) in document.compiled_slots() {
        assert_eq!(slot.spirv()[0], SPIRV_MAGIC);
    }

    assert_eq!(document.compiled_slots().count(), 2);
}

#[test]
fn compute_document_produces_one_tagged_entry() {
    let compiler = ShaderCompiler::new().unwrap();

    let document = pipeline(&compiler)
        .process_source(PathBuf::from("compute.shader"), COMPUTE.to_owned())
        .unwrap();

    let pack = ShaderPack::from_bytes(&shaderland::pack::to_bytes(&document)).unwrap();

    assert_eq!(pack.entries().len(), 1);
    assert_eq!(pack.entries()[0].stage, ShaderStage::Compute);
    assert_eq!(pack.entries()[0].stage.tag(), 5);
    assert_eq!(pack.entries()[0].spirv[0], SPIRV_MAGIC);
}

#[test]
fn geometry_stage_compiles_alongside_fragment() {
    let compiler = ShaderCompiler::new().unwrap();

    let source = "\
#shader geometry
layout(triangles) in;
layout(triangle_strip, max_vertices = 3) out;
void main() {
    for (int i = 0; i < 3; i++) {
        gl_Position = gl_in[i].gl_Position;
        EmitVertex();
    }
    EndPrimitive();
}
#shader fragment
layout(location = 0) out vec4 color;
void main() {
    color = vec4(0.5);
}
";

    let document = pipeline(&compiler)
        .process_source(PathBuf::from("geo.shader"), source.to_owned())
        .unwrap();

    assert_eq!(document.stages(), StageSet::GEOMETRY | StageSet::FRAGMENT);
    assert_eq!(document.compiled_slots().count(), 2);
}

#[test]
fn vertex_without_fragment_is_rejected_before_compilation() {
    let compiler = ShaderCompiler::new().unwrap();

    // The body is not GLSL. If the toolchain ever saw it this would fail
    // with a compile error, so a validation error proves the rejection
    // happened first.
    let source = "#shader vertex\nthis is not even remotely glsl but contains main\n";

    let err = pipeline(&compiler)
        .process_source(PathBuf::from("broken.shader"), source.to_owned())
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Validate(ValidateError::VertexWithoutFragment)
    ));
}

#[test]
fn compute_mixed_with_fragment_is_rejected_before_compilation() {
    let compiler = ShaderCompiler::new().unwrap();

    let source = "#shader compute\nnot glsl, main\n#shader fragment\nnot glsl, main\n";

    let err = pipeline(&compiler)
        .process_source(PathBuf::from("mixed.shader"), source.to_owned())
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Validate(ValidateError::ComputeWithRaster)
    ));
}

#[test]
fn duplicate_stage_fails_under_the_default_policy() {
    let compiler = ShaderCompiler::new().unwrap();

    let source = "\
#shader compute
layout(local_size_x = 1) in;
void main() {}
#shader compute
layout(local_size_x = 1) in;
void main() {}
";

    let err = pipeline(&compiler)
        .process_source(PathBuf::from("dup.shader"), source.to_owned())
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Segment(SegmentError::DuplicateStage(ShaderStage::Compute))
    ));
}

#[test]
fn duplicate_stage_compiles_first_block_when_lenient() {
    let compiler = ShaderCompiler::new().unwrap();

    let source = "\
#shader compute
layout(local_size_x = 1) in;
void main() {}
#shader compute
this block is dropped before the toolchain runs
";

    let document = Pipeline::new(&compiler, SegmentOptions::lenient(), Vec::new())
        .process_source(PathBuf::from("dup.shader"), source.to_owned())
        .unwrap();

    assert_eq!(document.compiled_slots().count(), 1);
}

#[test]
fn user_macros_reach_the_toolchain() {
    let compiler = ShaderCompiler::new().unwrap();

    // BRIGHTNESS has no definition in the source; compilation only succeeds
    // if the injected user macro provides one.
    let source = "\
#shader fragment
layout(location = 0) out vec4 color;
void main() {
    color = vec4(BRIGHTNESS);
}
";

    let macros = vec![("BRIGHTNESS".to_owned(), "0.5".to_owned())];

    let document = Pipeline::new(&compiler, SegmentOptions::default(), macros)
        .process_source(PathBuf::from("macro.shader"), source.to_owned())
        .unwrap();

    assert_eq!(document.compiled_slots().count(), 1);
}

#[test]
fn glsl_errors_surface_the_stage_and_the_log() {
    let compiler = ShaderCompiler::new().unwrap();

    let source = "#shader fragment\nvoid main() { undeclared_symbol = 1.0; }\n";

    let err = pipeline(&compiler)
        .process_source(PathBuf::from("bad.shader"), source.to_owned())
        .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("fragment"));
    assert!(message.contains("undeclared_symbol"));
}

#[test]
fn process_file_writes_a_loadable_pack() {
    let compiler = ShaderCompiler::new().unwrap();
    let dir = tempfile::tempdir().unwrap();

    let input = dir.path().join("triangle.shader");
    fs::write(&input, GRAPHICS).unwrap();

    let output = pipeline(&compiler).process_file(&input, None).unwrap();

    assert_eq!(output, dir.path().join("triangle.spirv"));

    let pack = ShaderPack::from_bytes(&fs::read(&output).unwrap()).unwrap();

    assert_eq!(pack.stages(), StageSet::VERTEX | StageSet::FRAGMENT);
    assert_eq!(pack.spirv(ShaderStage::Vertex).unwrap()[0], SPIRV_MAGIC);
    assert_eq!(pack.spirv(ShaderStage::Fragment).unwrap()[0], SPIRV_MAGIC);
}

#[test]
fn empty_input_file_is_an_error() {
    let compiler = ShaderCompiler::new().unwrap();
    let dir = tempfile::tempdir().unwrap();

    let input = dir.path().join("empty.shader");
    fs::write(&input, "   \n\n").unwrap();

    let err = pipeline(&compiler).process_file(&input, None).unwrap_err();

    assert!(matches!(err, Error::EmptyFile));
}
