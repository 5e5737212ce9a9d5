use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};
use tracing::debug;

use crate::config::{
    AimMode, GrabConfig, InteractableConfig, SafetyConfig, ThrowConfig, ThrowModel, TriggerConfig,
};
use crate::coordinator::ExclusivityGroup;
use crate::math::Vec3;
use crate::scene::CollisionLayer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InteractableDefId(pub u32);

#[derive(Debug, Clone, PartialEq)]
pub struct InteractableDef {
    pub id: InteractableDefId,
    pub def_name: String,
    pub label: String,
    pub config: InteractableConfig,
}

#[derive(Debug, Default, Clone)]
pub struct InteractableDefDatabase {
    defs: Vec<InteractableDef>,
    ids_by_name: HashMap<String, InteractableDefId>,
}

impl InteractableDefDatabase {
    fn from_defs(mut defs: Vec<InteractableDef>) -> Self {
        let mut ids_by_name = HashMap::with_capacity(defs.len());
        for (idx, def) in defs.iter_mut().enumerate() {
            let id = InteractableDefId(idx as u32);
            def.id = id;
            ids_by_name.insert(def.def_name.clone(), id);
        }
        Self { defs, ids_by_name }
    }

    pub fn def_id_by_name(&self, name: &str) -> Option<InteractableDefId> {
        self.ids_by_name.get(name).copied()
    }

    pub fn def(&self, id: InteractableDefId) -> Option<&InteractableDef> {
        self.defs.get(id.0 as usize)
    }

    pub fn def_by_name(&self, name: &str) -> Option<&InteractableDef> {
        self.def_id_by_name(name).and_then(|id| self.def(id))
    }

    pub fn defs(&self) -> &[InteractableDef] {
        &self.defs
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefErrorCode {
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    UnknownDefType,
    UnknownField,
    DuplicateField,
    MissingField,
    InvalidValue,
    DuplicateDef,
}

#[derive(Debug, Clone)]
pub struct DefCompileError {
    pub code: DefErrorCode,
    pub message: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for DefCompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (file={}, line={}, column={})",
                self.code,
                self.message,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (file={})",
                self.code,
                self.message,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for DefCompileError {}

/// Parsing context for one XML file.
struct DefSource<'a, 'input> {
    file_path: &'a Path,
    doc: &'a Document<'input>,
}

impl<'a, 'input> DefSource<'a, 'input> {
    fn error_at(&self, code: DefErrorCode, message: String, node: Node<'_, '_>) -> DefCompileError {
        let pos = self.doc.text_pos_at(node.range().start);
        DefCompileError {
            code,
            message,
            file_path: self.file_path.to_path_buf(),
            location: Some(SourceLocation {
                line: pos.row as usize,
                column: pos.col as usize,
            }),
        }
    }

    fn required_text(&self, node: Node<'_, '_>, field_name: &str) -> Result<String, DefCompileError> {
        let value = node.text().map(str::trim).unwrap_or_default().to_string();
        if value.is_empty() {
            return Err(self.error_at(
                DefErrorCode::MissingField,
                format!("field <{}> must not be empty", field_name),
                node,
            ));
        }
        Ok(value)
    }

    fn invalid(&self, node: Node<'_, '_>, message: String) -> DefCompileError {
        self.error_at(DefErrorCode::InvalidValue, message, node)
    }

    fn f32_field(&self, node: Node<'_, '_>, field_name: &str) -> Result<f32, DefCompileError> {
        let value = self.required_text(node, field_name)?;
        let parsed = value.parse::<f32>().map_err(|_| {
            self.invalid(node, format!("{} '{}' is not a valid number", field_name, value))
        })?;
        if !parsed.is_finite() {
            return Err(self.invalid(node, format!("{} must be finite", field_name)));
        }
        Ok(parsed)
    }

    fn bool_field(&self, node: Node<'_, '_>, field_name: &str) -> Result<bool, DefCompileError> {
        let value = self.required_text(node, field_name)?;
        match value.as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(self.invalid(
                node,
                format!("{} '{}' must be true or false", field_name, value),
            )),
        }
    }

    fn uint_field<T: std::str::FromStr>(
        &self,
        node: Node<'_, '_>,
        field_name: &str,
    ) -> Result<T, DefCompileError> {
        let value = self.required_text(node, field_name)?;
        value.parse::<T>().map_err(|_| {
            self.invalid(
                node,
                format!("{} '{}' is not a valid unsigned integer", field_name, value),
            )
        })
    }

    /// Accepts `x y z` or `x,y,z`.
    fn vec3_field(&self, node: Node<'_, '_>, field_name: &str) -> Result<Vec3, DefCompileError> {
        let value = self.required_text(node, field_name)?;
        let parts = value
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .map(str::parse::<f32>)
            .collect::<Result<Vec<_>, _>>();
        match parts.as_deref() {
            Ok([x, y, z]) if x.is_finite() && y.is_finite() && z.is_finite() => {
                Ok(Vec3::new(*x, *y, *z))
            }
            _ => Err(self.invalid(
                node,
                format!("{} '{}' must be three finite numbers", field_name, value),
            )),
        }
    }

    /// Yields element children, rejecting repeated field names.
    fn unique_fields<'n, 'i>(
        &self,
        node: Node<'n, 'i>,
        owner: &str,
    ) -> Result<Vec<Node<'n, 'i>>, DefCompileError> {
        let mut seen = HashSet::<String>::new();
        let mut fields = Vec::new();
        for field in node.children().filter(|child| child.is_element()) {
            let name = field.tag_name().name().to_string();
            if !seen.insert(name.clone()) {
                return Err(self.error_at(
                    DefErrorCode::DuplicateField,
                    format!("duplicate field <{}> in <{}>", name, owner),
                    field,
                ));
            }
            fields.push(field);
        }
        Ok(fields)
    }

    fn unknown_field(&self, field: Node<'_, '_>, owner: &str) -> DefCompileError {
        self.error_at(
            DefErrorCode::UnknownField,
            format!("unknown field <{}> in <{}>", field.tag_name().name(), owner),
            field,
        )
    }
}

pub fn compile_defs_str(
    file_path: &Path,
    raw: &str,
) -> Result<InteractableDefDatabase, DefCompileError> {
    let defs = parse_defs_document(file_path, raw)?;
    let mut seen = HashSet::<String>::new();
    for def in &defs {
        if !seen.insert(def.def_name.clone()) {
            return Err(duplicate_def_error(file_path, &def.def_name));
        }
    }
    Ok(InteractableDefDatabase::from_defs(defs))
}

pub fn compile_defs_file(path: &Path) -> Result<InteractableDefDatabase, DefCompileError> {
    let raw = fs::read_to_string(path).map_err(|source| read_error(path.to_path_buf(), source))?;
    compile_defs_str(path, &raw)
}

/// Compiles every `.xml` file under `root` in path order. A defName may be
/// defined only once across the whole tree.
pub fn compile_defs_dir(root: &Path) -> Result<InteractableDefDatabase, DefCompileError> {
    let files = collect_xml_files_sorted(root)?;
    let mut seen = HashSet::<String>::new();
    let mut merged = Vec::<InteractableDef>::new();
    for file in files {
        let raw =
            fs::read_to_string(&file).map_err(|source| read_error(file.clone(), source))?;
        let defs = parse_defs_document(&file, &raw)?;
        debug!(file = %file.display(), defs = defs.len(), "interactable_defs_parsed");
        for def in defs {
            if !seen.insert(def.def_name.clone()) {
                return Err(duplicate_def_error(&file, &def.def_name));
            }
            merged.push(def);
        }
    }
    Ok(InteractableDefDatabase::from_defs(merged))
}

fn parse_defs_document(
    file_path: &Path,
    raw: &str,
) -> Result<Vec<InteractableDef>, DefCompileError> {
    let doc = Document::parse(raw).map_err(|error| DefCompileError {
        code: DefErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })?;
    let source = DefSource {
        file_path,
        doc: &doc,
    };

    let root = doc.root_element();
    if root.tag_name().name() != "InteractableDefs" {
        return Err(source.error_at(
            DefErrorCode::InvalidRoot,
            "root element must be <InteractableDefs>".to_string(),
            root,
        ));
    }

    let mut defs = Vec::new();
    for child in root.children().filter(|node| node.is_element()) {
        if child.tag_name().name() != "InteractableDef" {
            return Err(source.error_at(
                DefErrorCode::UnknownDefType,
                format!(
                    "unsupported def type <{}>; expected <InteractableDef>",
                    child.tag_name().name()
                ),
                child,
            ));
        }
        defs.push(parse_interactable_def(&source, child)?);
    }
    Ok(defs)
}

fn parse_interactable_def(
    source: &DefSource<'_, '_>,
    node: Node<'_, '_>,
) -> Result<InteractableDef, DefCompileError> {
    let mut def_name: Option<String> = None;
    let mut label: Option<String> = None;
    let mut config = InteractableConfig::default();

    for field in source.unique_fields(node, "InteractableDef")? {
        match field.tag_name().name() {
            "defName" => def_name = Some(source.required_text(field, "defName")?),
            "label" => label = Some(source.required_text(field, "label")?),
            "exclusivityGroup" => {
                config.exclusivity_group =
                    ExclusivityGroup(source.uint_field(field, "exclusivityGroup")?);
            }
            "grab" => config.grab = Some(parse_grab(source, field)?),
            "throw" => config.throwable = Some(parse_throw(source, field)?),
            "safety" => config.safety = Some(parse_safety(source, field)?),
            "trigger" => config.trigger = Some(parse_trigger(source, field)?),
            _ => return Err(source.unknown_field(field, "InteractableDef")),
        }
    }

    let Some(def_name) = def_name else {
        return Err(source.error_at(
            DefErrorCode::MissingField,
            "missing required field <defName> in <InteractableDef>".to_string(),
            node,
        ));
    };
    config.validate().map_err(|error| {
        source.invalid(node, format!("invalid config for '{}': {}", def_name, error))
    })?;

    Ok(InteractableDef {
        id: InteractableDefId(0),
        label: label.unwrap_or_else(|| def_name.clone()),
        def_name,
        config,
    })
}

fn parse_grab(source: &DefSource<'_, '_>, node: Node<'_, '_>) -> Result<GrabConfig, DefCompileError> {
    let mut grab = GrabConfig::default();
    for field in source.unique_fields(node, "grab")? {
        let name = field.tag_name().name();
        match name {
            "detectionRadius" => grab.detection_radius = source.f32_field(field, name)?,
            "minGrabDistance" => grab.min_grab_distance = source.f32_field(field, name)?,
            "maxGrabDistance" => grab.max_grab_distance = source.f32_field(field, name)?,
            "aimMode" => {
                let value = source.required_text(field, name)?;
                grab.aim_mode = match value.as_str() {
                    "Cone" => AimMode::Cone,
                    "Ray" => AimMode::Ray,
                    _ => {
                        return Err(source.invalid(
                            field,
                            format!("invalid aimMode '{}'; allowed values: Cone, Ray", value),
                        ))
                    }
                };
            }
            "handAnchorName" => grab.hand_anchor_name = source.required_text(field, name)?,
            "fallbackAnchorOffset" => {
                grab.fallback_anchor_offset = source.vec3_field(field, name)?
            }
            "grabOffset" => grab.grab_offset = source.vec3_field(field, name)?,
            "allowMultiGrab" => grab.allow_multi_grab = source.bool_field(field, name)?,
            "heldLayer" => grab.held_layer = CollisionLayer(source.uint_field(field, name)?),
            _ => return Err(source.unknown_field(field, "grab")),
        }
    }
    Ok(grab)
}

fn parse_throw(
    source: &DefSource<'_, '_>,
    node: Node<'_, '_>,
) -> Result<ThrowConfig, DefCompileError> {
    let mut throwable = ThrowConfig::default();
    for field in source.unique_fields(node, "throw")? {
        let name = field.tag_name().name();
        match name {
            "model" => {
                let value = source.required_text(field, name)?;
                throwable.model = match value.as_str() {
                    "Sampled" => ThrowModel::Sampled,
                    "CameraDirection" => ThrowModel::CameraDirection,
                    _ => {
                        return Err(source.invalid(
                            field,
                            format!(
                                "invalid model '{}'; allowed values: Sampled, CameraDirection",
                                value
                            ),
                        ))
                    }
                };
            }
            "throwForce" => throwable.throw_force = source.f32_field(field, name)?,
            "upwardBoost" => throwable.upward_boost = source.f32_field(field, name)?,
            "velocityMultiplier" => throwable.velocity_multiplier = source.f32_field(field, name)?,
            "maxThrowVelocity" => throwable.max_throw_velocity = source.f32_field(field, name)?,
            "noiseFloor" => throwable.noise_floor = source.f32_field(field, name)?,
            "sampleCapacity" => throwable.sample_capacity = source.uint_field(field, name)?,
            "impactThreshold" => throwable.impact_threshold = source.f32_field(field, name)?,
            _ => return Err(source.unknown_field(field, "throw")),
        }
    }
    Ok(throwable)
}

fn parse_safety(
    source: &DefSource<'_, '_>,
    node: Node<'_, '_>,
) -> Result<SafetyConfig, DefCompileError> {
    let mut safety = SafetyConfig::default();
    for field in source.unique_fields(node, "safety")? {
        let name = field.tag_name().name();
        match name {
            "floorY" => safety.floor_y = source.f32_field(field, name)?,
            "maxSpawnDistance" => safety.max_spawn_distance = source.f32_field(field, name)?,
            "checkInterval" => safety.check_interval = source.f32_field(field, name)?,
            _ => return Err(source.unknown_field(field, "safety")),
        }
    }
    Ok(safety)
}

fn parse_trigger(
    source: &DefSource<'_, '_>,
    node: Node<'_, '_>,
) -> Result<TriggerConfig, DefCompileError> {
    let mut trigger = TriggerConfig::default();
    for field in source.unique_fields(node, "trigger")? {
        let name = field.tag_name().name();
        match name {
            "cooldown" => trigger.cooldown = source.f32_field(field, name)?,
            "triggerOnce" => trigger.trigger_once = source.bool_field(field, name)?,
            _ => return Err(source.unknown_field(field, "trigger")),
        }
    }
    Ok(trigger)
}

fn duplicate_def_error(file_path: &Path, def_name: &str) -> DefCompileError {
    DefCompileError {
        code: DefErrorCode::DuplicateDef,
        message: format!(
            "duplicate InteractableDef '{}'; each defName may be defined only once",
            def_name
        ),
        file_path: file_path.to_path_buf(),
        location: None,
    }
}

fn read_error(path: PathBuf, source: std::io::Error) -> DefCompileError {
    DefCompileError {
        code: DefErrorCode::ReadFile,
        message: format!("failed to read: {source}"),
        file_path: path,
        location: None,
    }
}

fn collect_xml_files_sorted(root: &Path) -> Result<Vec<PathBuf>, DefCompileError> {
    let mut files = Vec::<PathBuf>::new();
    collect_recursive(root, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_recursive(current: &Path, files: &mut Vec<PathBuf>) -> Result<(), DefCompileError> {
    let entries =
        fs::read_dir(current).map_err(|source| read_error(current.to_path_buf(), source))?;
    for entry in entries {
        let entry = entry.map_err(|source| read_error(current.to_path_buf(), source))?;
        let path = entry.path();
        if path.is_dir() {
            collect_recursive(&path, files)?;
        } else if path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
        {
            files.push(path);
        }
    }
    Ok(())
}
