use super::pb::*;
use crate::internal::*;

/// Types an `Argument` can carry, as single value or list.
pub trait ArgScalarType: Sized + Clone {
    const NAME: &'static str;
    fn get_single(arg: &Argument) -> UmbraResult<Option<Self>>;
    fn get_repeated(arg: &Argument) -> UmbraResult<Vec<Self>>;
}

impl ArgScalarType for f32 {
    const NAME: &'static str = "float";
    fn get_single(arg: &Argument) -> UmbraResult<Option<Self>> {
        Ok(arg.s_f)
    }
    fn get_repeated(arg: &Argument) -> UmbraResult<Vec<Self>> {
        Ok(arg.v_f.clone())
    }
}

impl ArgScalarType for i32 {
    const NAME: &'static str = "int";
    fn get_single(arg: &Argument) -> UmbraResult<Option<Self>> {
        Ok(arg.s_i)
    }
    fn get_repeated(arg: &Argument) -> UmbraResult<Vec<Self>> {
        Ok(arg.v_i.clone())
    }
}

impl ArgScalarType for usize {
    const NAME: &'static str = "non-negative int";
    fn get_single(arg: &Argument) -> UmbraResult<Option<Self>> {
        arg.s_i
            .map(|i| {
                usize::try_from(i).map_err(|_| {
                    format_err!("Argument {} must be non-negative, got {}", arg.name, i)
                })
            })
            .transpose()
    }
    fn get_repeated(arg: &Argument) -> UmbraResult<Vec<Self>> {
        arg.v_i
            .iter()
            .map(|&i| {
                usize::try_from(i).map_err(|_| {
                    format_err!("Argument {} must be non-negative, got {}", arg.name, i)
                })
            })
            .collect()
    }
}

impl ArgScalarType for bool {
    const NAME: &'static str = "bool";
    fn get_single(arg: &Argument) -> UmbraResult<Option<Self>> {
        Ok(arg.s_i.map(|i| i != 0))
    }
    fn get_repeated(arg: &Argument) -> UmbraResult<Vec<Self>> {
        Ok(arg.v_i.iter().map(|&i| i != 0).collect())
    }
}

impl ArgScalarType for String {
    const NAME: &'static str = "string";
    fn get_single(arg: &Argument) -> UmbraResult<Option<Self>> {
        Ok(arg.s_s.clone())
    }
    fn get_repeated(arg: &Argument) -> UmbraResult<Vec<Self>> {
        Ok(arg.v_s.clone())
    }
}

/// Typed lookup over a list of arguments.
#[derive(Debug, Clone, Default)]
pub struct ArgumentHelper {
    args: HashMap<String, Argument>,
}

impl ArgumentHelper {
    pub fn new(args: &[Argument]) -> UmbraResult<ArgumentHelper> {
        let mut map = HashMap::new();
        for arg in args {
            if map.insert(arg.name.clone(), arg.clone()).is_some() {
                bail!("Duplicate argument {}", arg.name)
            }
        }
        Ok(ArgumentHelper { args: map })
    }

    pub fn has(&self, name: &str) -> bool {
        self.args.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.args.keys().map(|s| &**s)
    }

    /// Single value, if the argument is present.
    pub fn single_opt<T: ArgScalarType>(&self, name: &str) -> UmbraResult<Option<T>> {
        let Some(arg) = self.args.get(name) else { return Ok(None) };
        match T::get_single(arg)? {
            Some(v) => Ok(Some(v)),
            None => bail!("Argument {} has no single {} value", name, T::NAME),
        }
    }

    /// Single value, or `default` if the argument is absent.
    pub fn single<T: ArgScalarType>(&self, name: &str, default: T) -> UmbraResult<T> {
        Ok(self.single_opt(name)?.unwrap_or(default))
    }

    pub fn required<T: ArgScalarType>(&self, name: &str) -> UmbraResult<T> {
        self.single_opt(name)?.with_context(|| format!("Required argument {} not found", name))
    }

    /// List value, empty if the argument is absent.
    pub fn repeated<T: ArgScalarType>(&self, name: &str) -> UmbraResult<Vec<T>> {
        match self.args.get(name) {
            Some(arg) => T::get_repeated(arg),
            None => Ok(vec![]),
        }
    }

    pub fn required_repeated<T: ArgScalarType>(&self, name: &str) -> UmbraResult<Vec<T>> {
        ensure!(self.has(name), "Required argument {} not found", name);
        self.repeated(name)
    }
}

impl Argument {
    fn named(name: &str) -> Argument {
        Argument { name: name.to_string(), ..Argument::default() }
    }

    pub fn float(name: &str, v: f32) -> Argument {
        Argument { s_f: Some(v), ..Self::named(name) }
    }

    pub fn int(name: &str, v: i32) -> Argument {
        Argument { s_i: Some(v), ..Self::named(name) }
    }

    pub fn bool(name: &str, v: bool) -> Argument {
        Self::int(name, v as i32)
    }

    pub fn string(name: &str, v: &str) -> Argument {
        Argument { s_s: Some(v.to_string()), ..Self::named(name) }
    }

    pub fn floats(name: &str, v: &[f32]) -> Argument {
        Argument { v_f: v.to_vec(), ..Self::named(name) }
    }

    pub fn ints(name: &str, v: &[i32]) -> Argument {
        Argument { v_i: v.to_vec(), ..Self::named(name) }
    }

    pub fn strings(name: &str, v: &[&str]) -> Argument {
        Argument { v_s: v.iter().map(|s| s.to_string()).collect(), ..Self::named(name) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn helper() -> ArgumentHelper {
        ArgumentHelper::new(&[
            Argument::float("alpha", 0.5),
            Argument::int("pad", 2),
            Argument::bool("bias_term", false),
            Argument::ints("order", &[0, 2, 1]),
            Argument::strings("out_blob", &["a", "b"]),
            Argument::int("negative", -1),
        ])
        .unwrap()
    }

    #[test]
    fn defaults_and_values() {
        let args = helper();
        assert_eq!(args.single("alpha", 1f32).unwrap(), 0.5);
        assert_eq!(args.single("beta", 0.75f32).unwrap(), 0.75);
        assert_eq!(args.single::<usize>("pad", 0).unwrap(), 2);
        assert!(!args.single("bias_term", true).unwrap());
        assert_eq!(args.repeated::<usize>("order").unwrap(), vec![0, 2, 1]);
        assert_eq!(args.repeated::<String>("out_blob").unwrap(), vec!["a", "b"]);
        assert!(args.repeated::<f32>("missing").unwrap().is_empty());
    }

    #[test]
    fn type_and_presence_errors() {
        let args = helper();
        assert!(args.required::<i32>("stride").is_err());
        assert!(args.single::<f32>("pad", 0.).is_err());
        assert!(args.single::<usize>("negative", 0).is_err());
        assert!(args.required_repeated::<String>("missing").is_err());
    }

    #[test]
    fn duplicates() {
        assert!(ArgumentHelper::new(&[Argument::int("a", 1), Argument::int("a", 2)]).is_err());
    }
}
