use std::fs;

use rand::Rng;
use thiserror::Error;

use super::material::{random_color, Material, Reflection};
use super::math::{Mat4, Vec3};
use super::model::import_mesh;
use super::scene::Scene;
use super::shape::{BoundingBox, Sphere, Triangle};

#[derive(Debug, Clone, Copy)]
struct FilePosition {
    line: u32,
    column: u32,
    index: usize,
}

impl FilePosition {
    fn new() -> Self {
        FilePosition {
            line: 0,
            column: 0,
            index: 0,
        }
    }
}

#[derive(Debug, Error)]
#[error("{message} at {line}:{column}")]
pub struct ParserError {
    message: String,
    line: u32,
    column: u32,
}

type ParserResult<T> = Result<T, ParserError>;

/// Tokenizer and directive interpreter for the scene text format: a flat,
/// whitespace-delimited stream of case-insensitive directives, with vector
/// literals written `(x,y,z)` and `#` starting a line comment.
///
/// The format carries no material information, so every object drawn from it
/// gets a material sampled from the caller's generator, and ambient and
/// background start from random colors that directives may override.
pub struct SceneParser {
    chars: Vec<char>,
    position: FilePosition,
}

impl SceneParser {
    pub fn new(content: &str) -> SceneParser {
        SceneParser {
            chars: content.chars().collect(),
            position: FilePosition::new(),
        }
    }

    fn current(&self) -> Option<char> {
        self.chars.get(self.position.index).copied()
    }

    fn advance(&mut self) {
        if let Some(current) = self.current() {
            if current == '\n' {
                self.position.line += 1;
                self.position.column = 0;
            } else {
                self.position.column += 1;
            }
            self.position.index += 1;
        }
    }

    fn skip_separators(&mut self) {
        while let Some(current) = self.current() {
            if current == '#' {
                // consume the comment up to the end of the line
                while self.current().is_some_and(|c| c != '\n') {
                    self.advance();
                }
            } else if !current.is_whitespace() {
                break;
            }
            self.advance();
        }
    }

    fn is_empty(&mut self) -> bool {
        self.skip_separators();
        self.current().is_none()
    }

    fn pop(&mut self) -> String {
        self.skip_separators();
        let mut token = String::new();
        let Some(first) = self.current() else {
            return token;
        };
        match first {
            '(' | ')' | ',' => {
                token.push(first);
                self.advance();
            }
            '+' | '-' | '.' | '0'..='9' => {
                if first == '+' || first == '-' {
                    token.push(first);
                    self.advance();
                }
                while self.current().is_some_and(|c| c.is_ascii_digit()) {
                    token.push(self.current().unwrap());
                    self.advance();
                }
                if self.current() == Some('.') {
                    token.push('.');
                    self.advance();
                    while self.current().is_some_and(|c| c.is_ascii_digit()) {
                        token.push(self.current().unwrap());
                        self.advance();
                    }
                }
            }
            _ => {
                while self
                    .current()
                    .is_some_and(|c| !c.is_whitespace() && !matches!(c, '(' | ')' | ',' | '#'))
                {
                    token.push(self.current().unwrap());
                    self.advance();
                }
            }
        }
        token
    }

    /// Pops a whole whitespace-delimited token, for file paths.
    fn pop_path(&mut self) -> String {
        self.skip_separators();
        let mut token = String::new();
        while self.current().is_some_and(|c| !c.is_whitespace()) {
            token.push(self.current().unwrap());
            self.advance();
        }
        token
    }

    fn error(&self, message: String) -> ParserError {
        ParserError {
            message,
            line: self.position.line + 1,
            column: self.position.column + 1,
        }
    }

    fn expect_token(&mut self, expected: &str) -> ParserResult<()> {
        let token = self.pop();
        if token == expected {
            Ok(())
        } else {
            Err(self.error(format!("expected '{}', got '{}'", expected, token)))
        }
    }

    fn parse_float(&mut self) -> ParserResult<f32> {
        let token = self.pop();
        token
            .parse::<f32>()
            .map_err(|_| self.error(format!("cannot interpret '{}' as a number", token)))
    }

    fn parse_vec3(&mut self) -> ParserResult<Vec3> {
        self.expect_token("(")?;
        let x = self.parse_float()?;
        self.expect_token(",")?;
        let y = self.parse_float()?;
        self.expect_token(",")?;
        let z = self.parse_float()?;
        self.expect_token(")")?;
        Ok(Vec3::new(x, y, z))
    }

    fn parse_camera(&mut self, scene: &mut Scene) -> ParserResult<()> {
        scene.eye = self.parse_vec3()?;
        scene.center = self.parse_vec3()?;
        scene.up = self.parse_vec3()?;
        Ok(())
    }

    fn parse_sphere<R: Rng>(&mut self, scene: &mut Scene, rng: &mut R) -> ParserResult<()> {
        let center = self.parse_vec3()?;
        let radius = self.parse_float()?;
        let object = scene.add_object(Material::random(rng));
        scene.add_shape(object, Box::new(Sphere::new(center, radius)));
        Ok(())
    }

    fn parse_triangle<R: Rng>(&mut self, scene: &mut Scene, rng: &mut R) -> ParserResult<()> {
        let a = self.parse_vec3()?;
        let b = self.parse_vec3()?;
        let c = self.parse_vec3()?;
        let object = scene.add_object(Material::random(rng));
        scene.add_shape(object, Box::new(Triangle::new(a, b, c)));
        Ok(())
    }

    fn parse_obj<R: Rng>(&mut self, scene: &mut Scene, rng: &mut R) -> ParserResult<()> {
        let path = self.pop_path();
        if path.is_empty() {
            return Err(self.error("missing mesh path after 'obj'".to_string()));
        }
        let translation = self.parse_vec3()?;
        let rotation = self.parse_vec3()?;
        let scaling = self.parse_vec3()?;
        let rotation = Vec3::new(
            rotation.x.to_radians(),
            rotation.y.to_radians(),
            rotation.z.to_radians(),
        );
        let transform = Mat4::scale(scaling)
            .then(&Mat4::rotate_xyz(rotation))
            .then(&Mat4::translate(translation));
        match import_mesh(&path, &transform) {
            Ok(triangles) => {
                let object = scene.add_object(Material::random(rng));
                for triangle in triangles {
                    scene.add_shape(object, Box::new(BoundingBox::new(Box::new(triangle))));
                }
            }
            Err(error) => {
                // a failed import contributes no shapes, the rest of the
                // scene still loads
                log::error!("cannot load model \"{}\": {}", path, error);
            }
        }
        Ok(())
    }

    pub fn parse_into<R: Rng>(&mut self, scene: &mut Scene, rng: &mut R) {
        scene.background = random_color(rng);
        scene.ambient = random_color(rng);
        while !self.is_empty() {
            let token = self.pop();
            let keyword = token.to_lowercase();
            let outcome = match keyword.as_str() {
                "width" => self.parse_float().map(|w| scene.set_width(w as u32)),
                "height" => self.parse_float().map(|h| scene.set_height(h as u32)),
                "fov" => self.parse_float().map(|fov| scene.set_fov(fov)),
                "samples" => self.parse_float().map(|s| scene.samples = s as u32),
                "background" => self.parse_vec3().map(|c| scene.background = c),
                "ambient" => self.parse_vec3().map(|c| scene.ambient = c),
                "eye" => self.parse_vec3().map(|v| scene.eye = v),
                "center" => self.parse_vec3().map(|v| scene.center = v),
                "up" => self.parse_vec3().map(|v| scene.up = v),
                "camera" => self.parse_camera(scene),
                "sphere" => self.parse_sphere(scene, rng),
                "triangle" => self.parse_triangle(scene, rng),
                "obj" => self.parse_obj(scene, rng),
                _ => {
                    log::debug!("skipping unrecognized token '{}'", token);
                    Ok(())
                }
            };
            if let Err(error) = outcome {
                log::warn!("skipping malformed '{}' directive: {}", keyword, error);
            }
        }
        promote_light(scene, rng);
    }
}

/// Rendering with no emitter at all would come out black, so when nothing in
/// the file ended up emissive one object is drawn at random and turned into a
/// light.
fn promote_light<R: Rng>(scene: &mut Scene, rng: &mut R) {
    let has_light = scene
        .objects()
        .iter()
        .any(|object| object.material.reflection == Reflection::Light);
    if has_light || scene.objects().is_empty() {
        return;
    }
    let index = rng.gen_range(0..scene.objects().len());
    scene.objects_mut()[index].material.reflection = Reflection::Light;
    log::debug!("no emitter in the scene, promoting object {} to a light", index);
}

/// Loads a scene from a file. When the file cannot be read at all the
/// compiled-in defaults are returned instead of an error, so the caller can
/// still render something.
pub fn load_scene<R: Rng>(path: &str, rng: &mut R) -> Scene {
    let mut scene = Scene::new();
    match fs::read_to_string(path) {
        Ok(content) => {
            SceneParser::new(&content).parse_into(&mut scene, rng);
            log::info!(
                "loaded {}: [{} x {}] fov {}, {} shapes in {} objects",
                path,
                scene.width(),
                scene.height(),
                scene.fov(),
                scene.shape_count(),
                scene.objects().len()
            );
        }
        Err(error) => {
            log::error!(
                "cannot read scene file {}: {}, rendering the default scene",
                path,
                error
            );
        }
    }
    scene
}
